//! Commit archive
//!
//! Each successful commit may leave a snapshot of the new running document
//! in the archive directory, named `<UTC timestamp>-<sha256 prefix>.json`.
//! Names sort chronologically.

use crate::atomic::atomic_write;
use crate::errors::{io_error, serialization_error, Result};
use cfgstore_core::document::Document;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const DIGEST_PREFIX_LEN: usize = 12;

/// Write a snapshot of `doc` under `dir`, returning its path
pub fn archive_document(dir: &Path, doc: &Document) -> Result<PathBuf> {
    let bytes = serde_json::to_vec_pretty(&doc.to_node())
        .map_err(|e| serialization_error("archive_document", e))?;
    let digest = hex::encode(Sha256::digest(&bytes));
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    let path = dir.join(format!("{}-{}.json", stamp, &digest[..DIGEST_PREFIX_LEN]));
    atomic_write(&path, &bytes)?;
    tracing::info!(path = %path.display(), digest = %digest, "document archived");
    Ok(path)
}

/// Archived snapshots, oldest first
pub fn list_archive(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error("list_archive", e))? {
        let path = entry.map_err(|e| io_error("list_archive", e))?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
