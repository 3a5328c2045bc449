//! Ordered, hash-indexed collection of schema entries

use super::entry::SchemaEntry;
use crate::errors::{CfgError, Result};
use crate::keylang;
use crate::value::Variable;
use std::collections::HashMap;
use std::fmt;

/// A non-fatal disagreement between a record and its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaWarning {
    NoSchema {
        key: String,
    },
    UnknownVariable {
        key: String,
        variable: String,
    },
    TypeMismatch {
        key: String,
        variable: String,
        expected: String,
        found: String,
    },
    UniquenessMismatch {
        key: String,
        variable: String,
        declared_unique: bool,
    },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::NoSchema { key } => write!(f, "{}: no schema entry", key),
            SchemaWarning::UnknownVariable { key, variable } => {
                write!(f, "{}: variable '{}' not declared", key, variable)
            }
            SchemaWarning::TypeMismatch {
                key,
                variable,
                expected,
                found,
            } => write!(
                f,
                "{}: variable '{}' has type {}, declared {}",
                key, variable, found, expected
            ),
            SchemaWarning::UniquenessMismatch {
                key,
                variable,
                declared_unique,
            } => write!(
                f,
                "{}: variable '{}' unique flag differs (declared unique: {})",
                key, variable, declared_unique
            ),
        }
    }
}

/// The schema of a datastore: one entry per declared pattern
///
/// Entries keep registration order; `lookup` returns the first entry whose
/// pattern matches. At most one pattern may match any real key, which
/// `check_disjoint` enforces when the index is built.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    entries: Vec<SchemaEntry>,
    by_pattern: HashMap<String, usize>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from entries, merging duplicates and checking that
    /// no two patterns overlap
    pub fn build(entries: impl IntoIterator<Item = SchemaEntry>) -> Result<Self> {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry)?;
        }
        index.check_disjoint()?;
        Ok(index)
    }

    /// Register an entry
    ///
    /// A pattern registered twice keeps its first entry; variables only the
    /// later registration declares are appended. A variable declared again
    /// with a different type or uniqueness keeps its first declaration and
    /// is reported as a warning.
    pub fn insert(&mut self, entry: SchemaEntry) -> Result<()> {
        keylang::validate_pattern(&entry.pattern)?;
        let Some(&idx) = self.by_pattern.get(&entry.pattern) else {
            self.by_pattern
                .insert(entry.pattern.clone(), self.entries.len());
            self.entries.push(entry);
            return Ok(());
        };
        let existing = &mut self.entries[idx];
        for var in entry.vars {
            match existing.vars.iter().find(|v| v.name == var.name) {
                None => existing.vars.push(var),
                Some(prev) if prev.ty != var.ty || prev.unique != var.unique => {
                    tracing::warn!(
                        key = %existing.pattern,
                        variable = %var.name,
                        kept = %prev,
                        dropped = %var,
                        "conflicting duplicate schema declaration, keeping the first"
                    );
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Reject patterns that could both match one concrete key, and list
    /// containers declared next to their own entries (`a` with `a[]`)
    pub fn check_disjoint(&self) -> Result<()> {
        for entry in &self.entries {
            let Some(container) = entry.pattern.strip_suffix(keylang::LIST_MARKER) else {
                continue;
            };
            if self.get(container).is_some() {
                return Err(CfgError::SchemaParse {
                    line: 0,
                    reason: format!(
                        "list container '{}' can not have an entry of its own besides '{}'",
                        container, entry.pattern
                    ),
                });
            }
        }
        for (i, entry) in self.entries.iter().enumerate() {
            let sample = keylang::sample_key(&entry.pattern);
            for (j, other) in self.entries.iter().enumerate() {
                if i != j && keylang::key_match(&sample, &other.pattern) {
                    return Err(CfgError::SchemaParse {
                        line: 0,
                        reason: format!(
                            "patterns '{}' and '{}' both match key '{}'",
                            entry.pattern, other.pattern, sample
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Find the entry a concrete key instantiates
    pub fn lookup(&self, key: &str) -> Option<&SchemaEntry> {
        if let Some(entry) = self.get(key) {
            return Some(entry);
        }
        self.entries
            .iter()
            .find(|e| keylang::key_match(key, &e.pattern))
    }

    /// Find an entry by its exact pattern text
    pub fn get(&self, pattern: &str) -> Option<&SchemaEntry> {
        self.by_pattern.get(pattern).map(|&i| &self.entries[i])
    }

    /// Is `prefix` a proper prefix of some pattern at a segment boundary?
    pub fn has_descendants(&self, prefix: &str) -> bool {
        self.entries.iter().any(|e| {
            e.pattern
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with("[]"))
        })
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cross-check a record against its schema entry
    ///
    /// Every warning is logged and returned; none of them is fatal.
    pub fn sanity_check(&self, key: &str, vars: &[Variable]) -> Vec<SchemaWarning> {
        let mut warnings = Vec::new();
        match self.lookup(key) {
            None => warnings.push(SchemaWarning::NoSchema {
                key: key.to_string(),
            }),
            Some(entry) => {
                for var in vars {
                    let Some(spec) = entry.var(&var.name) else {
                        warnings.push(SchemaWarning::UnknownVariable {
                            key: key.to_string(),
                            variable: var.name.clone(),
                        });
                        continue;
                    };
                    let found = var.value.value_type();
                    if found != spec.ty {
                        warnings.push(SchemaWarning::TypeMismatch {
                            key: key.to_string(),
                            variable: var.name.clone(),
                            expected: spec.ty.to_string(),
                            found: found.to_string(),
                        });
                    }
                    if var.unique != spec.unique {
                        warnings.push(SchemaWarning::UniquenessMismatch {
                            key: key.to_string(),
                            variable: var.name.clone(),
                            declared_unique: spec.unique,
                        });
                    }
                }
            }
        }
        for warning in &warnings {
            tracing::warn!(key, "schema sanity check: {}", warning);
        }
        warnings
    }

    /// Render the index in key-spec text format, one entry per line
    pub fn to_spec_string(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}
