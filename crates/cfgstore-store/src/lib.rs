//! cfgstore store - file-backed datastores and document persistence
//!
//! Provides:
//! - `SqliteStore`, a `Datastore` kept in one SQLite file per datastore
//! - Embedded migrations with checksums
//! - Atomic document save/load (JSON) and the commit archive

pub mod archive;
pub mod atomic;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod persist;
pub mod sqlite_store;

pub use archive::{archive_document, list_archive};
pub use errors::Result;
pub use persist::{load_document, load_into, save_document, save_store};
pub use sqlite_store::SqliteStore;
