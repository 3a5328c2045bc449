//! Load command
//!
//! Usage: cfgstore load --db <FILE> --spec <FILE> --file <FILE> [--replace]

use super::CommandResult;
use cfgstore_store::load_into;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[arg(long)]
    pub db: PathBuf,

    #[arg(long)]
    pub spec: PathBuf,

    /// Document file to read
    #[arg(long)]
    pub file: PathBuf,

    /// Clear the store first instead of merging by identity
    #[arg(long)]
    pub replace: bool,
}

pub fn execute(args: LoadArgs) -> CommandResult {
    super::init_logging();
    let (mut store, schema) = super::open_with_schema(&args.db, &args.spec)?;
    let report = load_into(&args.file, &schema, &mut store, args.replace)?;
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    println!("✓ Loaded {} records from {}", report.mapped, args.file.display());
    Ok(())
}
