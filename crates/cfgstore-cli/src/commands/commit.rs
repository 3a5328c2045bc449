//! Commit command
//!
//! Usage: cfgstore commit --options <FILE>
//!
//! Runs a backend with no plugins registered, so the commit only checks
//! the transaction pipeline and promotes candidate to running.

use super::CommandResult;
use cfgstore_core::logging_facility;
use cfgstore_engine::{Backend, Options};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CommitArgs {
    /// Backend options file (TOML)
    #[arg(long)]
    pub options: PathBuf,
}

pub fn execute(args: CommitArgs) -> CommandResult {
    let options = Options::load(&args.options)?;
    logging_facility::init(options.log_profile);

    let mut backend = Backend::open(&options)?;
    backend.startup()?;
    let outcome = backend.commit(std::process::id())?;
    tracing::info!(transaction = outcome.id, changes = outcome.diff.len(), "commit done");

    println!("✓ Committed {} changes", outcome.diff.len());
    if let Some(path) = outcome.archived {
        println!("  archived to {}", path.display());
    }
    Ok(())
}
