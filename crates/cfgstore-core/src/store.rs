//! Flat key/value datastore interface and the in-memory implementation
//!
//! Every layer above the codec talks to records through `Datastore`, so the
//! mapper, diff engine and coordinator run the same against a file-backed
//! store or a `MemoryStore` in tests.

use crate::codec;
use crate::errors::{CfgError, ExError, ExErrorKind};
use crate::value::Variable;
use regex::Regex;
use std::collections::BTreeMap;

pub type StoreResult<T> = std::result::Result<T, ExError>;

/// A raw record: key and encoded value
pub type RawRecord = (String, Vec<u8>);

pub trait Datastore {
    /// Name used in logs and hook data (`candidate`, `running`, a file path)
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Insert or replace a record
    fn set(&mut self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove a record, reporting whether it existed
    fn delete(&mut self, key: &str) -> StoreResult<bool>;

    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All records whose key matches `re`, ordered by key
    fn scan(&self, re: &Regex) -> StoreResult<Vec<RawRecord>>;

    /// Every record, ordered by key
    fn records(&self) -> StoreResult<Vec<RawRecord>>;

    fn clear(&mut self) -> StoreResult<()>;

    /// Replace every record with `records`
    ///
    /// Stores that can do so apply the replacement atomically.
    fn replace_all(&mut self, records: &[RawRecord]) -> StoreResult<()> {
        self.clear()?;
        for (key, value) in records {
            self.set(key, value)?;
        }
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.records()?.into_iter().map(|(k, _)| k).collect())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.records()?.len())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Compile a scan expression
pub fn compile_scan(pattern: &str) -> crate::errors::Result<Regex> {
    Regex::new(pattern).map_err(|e| CfgError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Read and decode one record
///
/// A record that fails to decode is reported and treated as absent.
pub fn read_vars(store: &dyn Datastore, key: &str) -> StoreResult<Option<Vec<Variable>>> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    match codec::decode(&bytes) {
        Ok(vars) => Ok(Some(vars)),
        Err(e) => {
            tracing::warn!(key, db = store.name(), error = %e, "undecodable record treated as absent");
            Ok(None)
        }
    }
}

/// Encode and write one record
pub fn write_vars(store: &mut dyn Datastore, key: &str, vars: &[Variable]) -> StoreResult<()> {
    let bytes = codec::encode(vars).map_err(|e| ExError::from(e).with_key(key))?;
    store.set(key, &bytes)
}

/// Replace the contents of `dst` with the records of `src`
pub fn copy_records(src: &dyn Datastore, dst: &mut dyn Datastore) -> StoreResult<usize> {
    let records = src.records()?;
    dst.replace_all(&records)?;
    tracing::debug!(from = src.name(), to = dst.name(), records = records.len(), "store copied");
    Ok(records.len())
}

/// Ordered in-memory datastore
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    records: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: BTreeMap::new(),
        }
    }

    /// Build a store from encoded records; intended for tests and fixtures
    pub fn from_vars<'a>(
        name: impl Into<String>,
        records: impl IntoIterator<Item = (&'a str, Vec<Variable>)>,
    ) -> StoreResult<Self> {
        let mut store = Self::new(name);
        for (key, vars) in records {
            write_vars(&mut store, key, &vars)?;
        }
        Ok(store)
    }
}

impl Datastore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(ExError::new(ExErrorKind::MalformedKey)
                .with_op("set")
                .with_message("empty key"));
        }
        self.records.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.records.remove(key).is_some())
    }

    fn scan(&self, re: &Regex) -> StoreResult<Vec<RawRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|(k, _)| re.is_match(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn records(&self) -> StoreResult<Vec<RawRecord>> {
        Ok(self
            .records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.records.clear();
        Ok(())
    }

    fn replace_all(&mut self, records: &[RawRecord]) -> StoreResult<()> {
        let mut next = Self::new(self.name.clone());
        for (key, value) in records {
            next.set(key, value)?;
        }
        self.records = next.records;
        Ok(())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_reports_presence() {
        let mut store = MemoryStore::new("candidate");
        store.set("a", b"").unwrap();
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(!store.exists("a").unwrap());
    }

    #[test]
    fn test_scan_is_ordered_and_filtered() {
        let mut store = MemoryStore::new("running");
        for key in ["if.2", "if.10", "if.1.addr.0", "system"] {
            store.set(key, b"").unwrap();
        }
        let re = compile_scan(&crate::keylang::entries_regex("if")).unwrap();
        let keys: Vec<String> = store.scan(&re).unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["if.10", "if.2"]);
    }

    #[test]
    fn test_undecodable_record_reads_as_absent() {
        let mut store = MemoryStore::new("candidate");
        store.set("broken", &[0, 6, 0, 9, b'x']).unwrap();
        assert_eq!(read_vars(&store, "broken").unwrap(), None);
    }

    #[test]
    fn test_failed_replace_keeps_records() {
        let mut store = MemoryStore::from_vars("candidate", [("a", vec![])]).unwrap();
        let records = vec![("b".to_string(), vec![]), (String::new(), vec![])];
        assert!(store.replace_all(&records).is_err());
        assert_eq!(store.keys().unwrap(), ["a"]);
    }

    #[test]
    fn test_copy_replaces_destination() {
        let src = MemoryStore::from_vars("running", [("a", vec![Variable::string("x", "1")])])
            .unwrap();
        let mut dst = MemoryStore::from_vars("candidate", [("b", vec![])]).unwrap();
        assert_eq!(copy_records(&src, &mut dst).unwrap(), 1);
        assert_eq!(dst.keys().unwrap(), ["a"]);
        assert_eq!(dst.get("a").unwrap(), src.get("a").unwrap());
    }
}
