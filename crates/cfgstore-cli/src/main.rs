//! cfgstore CLI
//!
//! Administrative access to configuration datastores

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cfgstore")]
#[command(about = "cfgstore - configuration datastore administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Key-spec operations
    Spec(commands::spec::SpecArgs),
    /// Print the contents of a datastore
    Show(commands::show::ShowArgs),
    /// Write one record
    Set(commands::set::SetArgs),
    /// Save a datastore as a document file
    Save(commands::save::SaveArgs),
    /// Load a document file into a datastore
    Load(commands::load::LoadArgs),
    /// Compare two datastores
    Diff(commands::diff::DiffArgs),
    /// Commit candidate to running
    Commit(commands::commit::CommitArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Spec(args) => commands::spec::execute(args),
        Commands::Show(args) => commands::show::execute(args),
        Commands::Set(args) => commands::set::execute(args),
        Commands::Save(args) => commands::save::execute(args),
        Commands::Load(args) => commands::load::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Commit(args) => commands::commit::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
