//! Show command
//!
//! Usage: cfgstore show --db <FILE> --spec <FILE> [--format text|xml|json|records]

use super::CommandResult;
use cfgstore_core::codec;
use cfgstore_core::document::{render_text, render_xml};
use cfgstore_core::mapper::to_document;
use cfgstore_core::Datastore;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Xml,
    Json,
    /// Flat records, one per line
    Records,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub db: PathBuf,

    #[arg(long)]
    pub spec: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

pub fn execute(args: ShowArgs) -> CommandResult {
    super::init_logging();
    let (store, schema) = super::open_with_schema(&args.db, &args.spec)?;

    if args.format == Format::Records {
        for (key, bytes) in store.records()? {
            let line = match codec::decode(&bytes) {
                Ok(vars) => vars
                    .iter()
                    .map(|v| format!(" {}{}={}", if v.unique { "!" } else { "" }, v.name, v.value))
                    .collect::<String>(),
                Err(e) => format!(" <undecodable: {}>", e),
            };
            println!("{}{}", key, line);
        }
        return Ok(());
    }

    let (doc, report) = to_document(&store, &schema)?;
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    match args.format {
        Format::Text => print!("{}", render_text(&doc)),
        Format::Xml => print!("{}", render_xml(&doc)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&doc.to_node())?),
        Format::Records => {}
    }
    Ok(())
}
