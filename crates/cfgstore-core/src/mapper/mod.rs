//! Mapping between flat datastore records and the document tree
//!
//! Flat to tree groups list entries by identity: every record of a list
//! entry carries the unique variables of that entry and of all enclosing
//! entries, and the element is found by comparing those values against the
//! unique leaf children already in the tree. Tree to flat runs the other way,
//! allocating list indices by probing the target store for an entry with the
//! same unique set, so loading a document upserts by identity.
//!
//! Both directions only warn about records or nodes they cannot place; the
//! warnings are logged and collected in a `MappingReport`.

mod from_document;
mod to_document;
mod unique_scope;

pub use from_document::{document_to_records, from_document};
pub use to_document::{records_to_document, to_document};
pub use unique_scope::{UniqueScope, UniqueStack};

use crate::errors::CfgError;

/// Non-fatal issues found while mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingReport {
    pub warnings: Vec<CfgError>,
    /// Records written (tree to flat) or placed (flat to tree)
    pub mapped: usize,
}

impl MappingReport {
    pub(crate) fn warn(&mut self, key: &str, err: CfgError) {
        tracing::warn!(key, error = %err, "mapping skipped");
        self.warnings.push(err);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
