//! Diff command
//!
//! Usage: cfgstore diff --spec <FILE> --first <FILE> --second <FILE>

use super::CommandResult;
use cfgstore_core::diff::{diff, render_summary};
use cfgstore_core::schema::load_key_spec;
use cfgstore_store::SqliteStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[arg(long)]
    pub spec: PathBuf,

    #[arg(long)]
    pub first: PathBuf,

    #[arg(long)]
    pub second: PathBuf,
}

pub fn execute(args: DiffArgs) -> CommandResult {
    super::init_logging();
    let schema = load_key_spec(&args.spec)?;
    let first = SqliteStore::open(args.first.display().to_string(), &args.first)?;
    let second = SqliteStore::open(args.second.display().to_string(), &args.second)?;
    let d = diff(&first, &second, &schema)?;
    print!("{}", render_summary(&d));
    Ok(())
}
