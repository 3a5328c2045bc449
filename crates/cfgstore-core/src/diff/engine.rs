//! Diff computation
//!
//! The entry point is [`diff`], which takes the old state as `first` and the
//! new state as `second` (running, candidate for a commit).

use crate::codec;
use crate::diff::model::{Diff, DiffEntry};
use crate::keylang;
use crate::schema::SchemaIndex;
use crate::store::{Datastore, StoreResult};
use crate::value::{same_var_set, Value, Variable};
use std::collections::BTreeMap;

/// Pairing key of a record across stores
///
/// Records below a list are identified by their pattern and the values of
/// their unique variables; everything else by its key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Identity {
    head: String,
    /// Declared unique values, in declaration order
    uniques: Vec<Value>,
}

type Side = BTreeMap<Identity, (String, Vec<Variable>)>;

/// Compare two stores and report the records that are not equal
///
/// # Errors
///
/// Returns the store error if either store cannot be read.
pub fn diff(
    first: &dyn Datastore,
    second: &dyn Datastore,
    schema: &SchemaIndex,
) -> StoreResult<Diff> {
    let mut a = collect(first, schema)?;
    let b = collect(second, schema)?;

    let mut merged: BTreeMap<Identity, DiffEntry> = BTreeMap::new();
    for (id, (key2, vars2)) in b {
        match a.remove(&id) {
            Some((key1, vars1)) => {
                if !same_var_set(&vars1, &vars2) {
                    merged.insert(id, DiffEntry::both(key1, vars1, key2, vars2));
                }
            }
            None => {
                merged.insert(id, DiffEntry::second_only(key2, vars2));
            }
        }
    }
    for (id, (key1, vars1)) in a {
        merged.insert(id, DiffEntry::first_only(key1, vars1));
    }
    let entries: Vec<DiffEntry> = merged.into_values().collect();

    tracing::debug!(
        first = first.name(),
        second = second.name(),
        diff_len = entries.len(),
        "stores compared"
    );
    Ok(Diff::new(entries))
}

fn collect(store: &dyn Datastore, schema: &SchemaIndex) -> StoreResult<Side> {
    let mut side = Side::new();
    for (key, bytes) in store.records()? {
        let vars = match codec::decode(&bytes) {
            Ok(vars) => vars,
            Err(e) => {
                tracing::warn!(key = %key, db = store.name(), error = %e, "undecodable record left out of diff");
                continue;
            }
        };
        let mut id = identity(&key, &vars, schema);
        if side.contains_key(&id) {
            // two entries with one identity in a store: fall back to keys
            id = by_key(&key);
        }
        side.insert(id, (key, vars));
    }
    Ok(side)
}

fn identity(key: &str, vars: &[Variable], schema: &SchemaIndex) -> Identity {
    let Some(entry) = schema.lookup(key) else {
        return by_key(key);
    };
    if !keylang::is_list_pattern(&entry.pattern) {
        return by_key(key);
    }
    match entry.identity_of(vars) {
        Some(uniques) if !uniques.is_empty() => Identity {
            head: entry.pattern.clone(),
            uniques,
        },
        _ => by_key(key),
    }
}

fn by_key(key: &str) -> Identity {
    Identity {
        head: key.to_string(),
        uniques: Vec::new(),
    }
}
