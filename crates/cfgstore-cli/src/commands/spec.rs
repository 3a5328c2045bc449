//! Spec command
//!
//! Usage: cfgstore spec check|dump --spec <FILE>

use super::CommandResult;
use cfgstore_core::schema::load_key_spec;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SpecArgs {
    #[command(subcommand)]
    pub command: SpecCommand,
}

#[derive(Debug, Subcommand)]
pub enum SpecCommand {
    /// Parse a key-spec file and report the number of entries
    Check(SpecFileArgs),
    /// Print a key-spec file in canonical form
    Dump(SpecFileArgs),
}

#[derive(Debug, Args)]
pub struct SpecFileArgs {
    #[arg(long)]
    pub spec: PathBuf,
}

pub fn execute(args: SpecArgs) -> CommandResult {
    super::init_logging();
    match args.command {
        SpecCommand::Check(args) => {
            let schema = load_key_spec(&args.spec)?;
            println!("{}: {} entries", args.spec.display(), schema.len());
        }
        SpecCommand::Dump(args) => {
            let schema = load_key_spec(&args.spec)?;
            print!("{}", schema.to_spec_string());
        }
    }
    Ok(())
}
