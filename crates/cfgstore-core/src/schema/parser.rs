//! Key-spec text parser
//!
//! One entry per line: `pattern $[!]name[:type][=default] ...`. `#` starts a
//! comment that runs to the end of the line.

use super::entry::{SchemaEntry, VarSpec};
use super::index::SchemaIndex;
use crate::errors::{CfgError, ExError, ExErrorKind};
use crate::value::{Value, ValueType};
use std::path::Path;

/// Parse key-spec text into a schema index
pub fn parse_key_spec(text: &str) -> crate::errors::Result<SchemaIndex> {
    let mut index = SchemaIndex::new();
    for (n, raw) in text.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let entry = parse_line(line_no, line)?;
        index.insert(entry).map_err(|e| at_line(line_no, e))?;
    }
    index.check_disjoint()?;
    Ok(index)
}

/// Read and parse a key-spec file
pub fn load_key_spec(path: &Path) -> Result<SchemaIndex, ExError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ExError::new(ExErrorKind::Io)
            .with_op("load_key_spec")
            .with_message(format!("cannot read key spec {}: {}", path.display(), e))
    })?;
    let index = parse_key_spec(&text)
        .map_err(|e| ExError::from(e).with_op("load_key_spec"))?;
    tracing::debug!(
        path = %path.display(),
        entries = index.len(),
        "key spec loaded"
    );
    Ok(index)
}

fn at_line(line: usize, err: CfgError) -> CfgError {
    match err {
        CfgError::SchemaParse { reason, .. } => CfgError::SchemaParse { line, reason },
        other => CfgError::SchemaParse {
            line,
            reason: other.to_string(),
        },
    }
}

fn parse_line(line_no: usize, line: &str) -> crate::errors::Result<SchemaEntry> {
    let mut tokens = line.split_whitespace();
    let pattern = tokens.next().unwrap_or_default();
    let mut vars = Vec::new();
    for token in tokens {
        let Some(decl) = token.strip_prefix('$') else {
            tracing::warn!(
                line = line_no,
                token,
                "ignoring key-spec token without '$' prefix"
            );
            continue;
        };
        vars.push(parse_var(decl).map_err(|e| at_line(line_no, e))?);
    }
    Ok(SchemaEntry::new(pattern, vars))
}

fn parse_var(decl: &str) -> crate::errors::Result<VarSpec> {
    let (decl, unique) = match decl.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (decl, false),
    };
    let (decl, default) = match decl.split_once('=') {
        Some((head, default)) => (head, Some(default)),
        None => (decl, None),
    };
    let (name, ty) = match decl.split_once(':') {
        Some((name, ty)) => (name, ValueType::from_name(ty)?),
        None => (decl, ValueType::String),
    };
    if name.is_empty() {
        return Err(CfgError::SchemaParse {
            line: 0,
            reason: "empty variable name".to_string(),
        });
    }
    let default = default.map(|text| Value::parse(ty, text)).transpose()?;
    Ok(VarSpec {
        name: name.to_string(),
        ty,
        unique,
        default,
    })
}
