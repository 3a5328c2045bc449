//! Set command
//!
//! Usage: cfgstore set --db <FILE> --spec <FILE> <KEY> [name=value ...]
//!
//! Values are parsed as the type the key spec declares for each variable.
//! The record is replaced as a whole.

use super::CommandResult;
use cfgstore_core::keylang::validate_key;
use cfgstore_core::store::write_vars;
use cfgstore_core::{ExError, ExErrorKind, SchemaEntry, Value, Variable};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(long)]
    pub db: PathBuf,

    #[arg(long)]
    pub spec: PathBuf,

    /// Concrete record key, e.g. interface.0
    pub key: String,

    /// Variables as name=value
    pub vars: Vec<String>,
}

pub fn execute(args: SetArgs) -> CommandResult {
    super::init_logging();
    let (mut store, schema) = super::open_with_schema(&args.db, &args.spec)?;
    validate_key(&args.key).map_err(|e| ExError::from(e).with_op("set").with_key(&args.key))?;
    let entry = schema.lookup(&args.key).ok_or_else(|| {
        ExError::new(ExErrorKind::SchemaNotFound)
            .with_op("set")
            .with_key(&args.key)
            .with_message(format!("no schema entry for key {}", args.key))
    })?;

    let vars = args
        .vars
        .iter()
        .map(|arg| parse_assignment(entry, &args.key, arg))
        .collect::<Result<Vec<_>, _>>()?;
    write_vars(&mut store, &args.key, &vars)?;
    println!("{}: {} variables written", args.key, vars.len());
    Ok(())
}

fn parse_assignment(entry: &SchemaEntry, key: &str, arg: &str) -> Result<Variable, ExError> {
    let invalid = |message: String| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("set")
            .with_key(key)
            .with_message(message)
    };
    let (name, text) = arg
        .split_once('=')
        .ok_or_else(|| invalid(format!("expected name=value, got '{}'", arg)))?;
    let spec = entry
        .var(name)
        .ok_or_else(|| invalid(format!("variable '{}' not declared for {}", name, entry.pattern)))?;
    let value = Value::parse(spec.ty, text).map_err(|e| ExError::from(e).with_op("set").with_key(key))?;
    Ok(Variable {
        name: name.to_string(),
        value,
        unique: spec.unique,
    })
}
