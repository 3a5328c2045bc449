//! Save command
//!
//! Usage: cfgstore save --db <FILE> --spec <FILE> --file <FILE>

use super::CommandResult;
use cfgstore_store::save_store;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SaveArgs {
    #[arg(long)]
    pub db: PathBuf,

    #[arg(long)]
    pub spec: PathBuf,

    /// Document file to write
    #[arg(long)]
    pub file: PathBuf,
}

pub fn execute(args: SaveArgs) -> CommandResult {
    super::init_logging();
    let (store, schema) = super::open_with_schema(&args.db, &args.spec)?;
    let report = save_store(&store, &schema, &args.file)?;
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    println!("✓ Saved {} records to {}", report.mapped, args.file.display());
    Ok(())
}
