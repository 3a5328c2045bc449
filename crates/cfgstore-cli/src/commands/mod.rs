//! CLI command implementations

pub mod commit;
pub mod diff;
pub mod load;
pub mod save;
pub mod set;
pub mod show;
pub mod spec;

use cfgstore_core::logging_facility::{self, Profile};
use cfgstore_core::schema::load_key_spec;
use cfgstore_core::SchemaIndex;
use cfgstore_store::SqliteStore;
use std::path::Path;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Logging for commands that do not read an options file
pub fn init_logging() {
    logging_facility::init(Profile::Development);
}

/// Open a store file and the schema describing it
pub fn open_with_schema(
    db: &Path,
    spec: &Path,
) -> Result<(SqliteStore, SchemaIndex), Box<dyn std::error::Error>> {
    let schema = load_key_spec(spec)?;
    let store = SqliteStore::open(db.display().to_string(), db)?;
    Ok((store, schema))
}
