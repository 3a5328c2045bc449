//! Document files
//!
//! A saved datastore is the JSON form of its document tree. Saving goes
//! through `atomic_write`; loading maps the tree back into a store by
//! identity.

use crate::atomic::atomic_write;
use crate::errors::{io_error, serialization_error, Result};
use cfgstore_core::document::{DocNode, Document};
use cfgstore_core::mapper::{from_document, to_document, MappingReport};
use cfgstore_core::schema::SchemaIndex;
use cfgstore_core::store::{Datastore, MemoryStore};
use std::path::Path;

/// Write a document file
pub fn save_document(path: &Path, doc: &Document) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(&doc.to_node())
        .map_err(|e| serialization_error("save_document", e))?;
    atomic_write(path, &bytes)?;
    tracing::debug!(path = %path.display(), elements = doc.element_count(), "document saved");
    Ok(())
}

/// Read a document file
pub fn load_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|e| {
        io_error("load_document", e).with_key(path.display().to_string())
    })?;
    let node: DocNode =
        serde_json::from_slice(&bytes).map_err(|e| serialization_error("load_document", e))?;
    Ok(Document::from_node(&node))
}

/// Save the document view of `store`
pub fn save_store(store: &dyn Datastore, schema: &SchemaIndex, path: &Path) -> Result<MappingReport> {
    let (doc, report) = to_document(store, schema)?;
    save_document(path, &doc)?;
    Ok(report)
}

/// Map a document file into `store`
///
/// With `replace` the store is emptied first; otherwise list entries are
/// upserted by identity and other records overwritten. The mapping is staged
/// in memory and applied with one `replace_all`, so a failure leaves `store`
/// as it was on stores that replace atomically.
pub fn load_into(
    path: &Path,
    schema: &SchemaIndex,
    store: &mut dyn Datastore,
    replace: bool,
) -> Result<MappingReport> {
    let doc = load_document(path)?;
    let mut staged = MemoryStore::new(store.name());
    if !replace {
        for (key, value) in store.records()? {
            staged.set(&key, &value)?;
        }
    }
    let report = from_document(&doc, schema, &mut staged)?;
    store.replace_all(&staged.records()?)?;
    tracing::debug!(
        path = %path.display(),
        db = store.name(),
        mapped = report.mapped,
        warnings = report.warnings.len(),
        "document loaded"
    );
    Ok(report)
}
