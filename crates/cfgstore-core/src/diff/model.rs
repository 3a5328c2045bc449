//! Diff output types

use crate::value::Variable;
use serde::{Deserialize, Serialize};

/// Which side(s) of the diff an entry is present in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOp {
    First,
    Second,
    Both,
}

impl DiffOp {
    pub fn in_first(self) -> bool {
        matches!(self, DiffOp::First | DiffOp::Both)
    }

    pub fn in_second(self) -> bool {
        matches!(self, DiffOp::Second | DiffOp::Both)
    }
}

/// Change classification seen by hooks, with `first` as the old state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Added,
    Removed,
    Changed,
}

impl From<DiffOp> for ChangeOp {
    fn from(op: DiffOp) -> Self {
        match op {
            DiffOp::First => ChangeOp::Removed,
            DiffOp::Second => ChangeOp::Added,
            DiffOp::Both => ChangeOp::Changed,
        }
    }
}

/// One differing record
///
/// `key1`/`vars1` describe the record in the first store, `key2`/`vars2`
/// the one in the second. For `Both` the two keys can differ when a list
/// entry moved to another index.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub op: DiffOp,
    pub key1: Option<String>,
    pub key2: Option<String>,
    pub vars1: Option<Vec<Variable>>,
    pub vars2: Option<Vec<Variable>>,
}

impl DiffEntry {
    pub fn first_only(key: String, vars: Vec<Variable>) -> Self {
        Self {
            op: DiffOp::First,
            key1: Some(key),
            key2: None,
            vars1: Some(vars),
            vars2: None,
        }
    }

    pub fn second_only(key: String, vars: Vec<Variable>) -> Self {
        Self {
            op: DiffOp::Second,
            key1: None,
            key2: Some(key),
            vars1: None,
            vars2: Some(vars),
        }
    }

    pub fn both(key1: String, vars1: Vec<Variable>, key2: String, vars2: Vec<Variable>) -> Self {
        Self {
            op: DiffOp::Both,
            key1: Some(key1),
            key2: Some(key2),
            vars1: Some(vars1),
            vars2: Some(vars2),
        }
    }

    /// The key used for matching: `key1` when present in the first store
    pub fn key(&self) -> &str {
        self.key1
            .as_deref()
            .or(self.key2.as_deref())
            .unwrap_or_default()
    }

    pub fn change_op(&self) -> ChangeOp {
        self.op.into()
    }
}

/// Ordered list of differing records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    entries: Vec<DiffEntry>,
}

impl Diff {
    pub fn new(entries: Vec<DiffEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffEntry> {
        self.entries.iter()
    }

    pub fn count(&self, op: DiffOp) -> usize {
        self.entries.iter().filter(|e| e.op == op).count()
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a DiffEntry;
    type IntoIter = std::slice::Iter<'a, DiffEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
