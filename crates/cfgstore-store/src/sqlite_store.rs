//! SQLite-backed datastore
//!
//! One database file holds one datastore in a single `records` table. Keys
//! are compared as text, so `records()` order matches `MemoryStore`.

use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use cfgstore_core::errors::{ExError, ExErrorKind};
use cfgstore_core::store::{Datastore, RawRecord, StoreResult};
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub struct SqliteStore {
    name: String,
    path: Option<PathBuf>,
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (creating if needed) the datastore file at `path`
    pub fn open(name: impl Into<String>, path: &Path) -> Result<Self> {
        let mut conn = db::open(path).map_err(|e| e.with_key(path.display().to_string()))?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        let name = name.into();
        tracing::debug!(db = %name, path = %path.display(), "datastore opened");
        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            conn,
        })
    }

    /// A datastore that lives only as long as this value
    pub fn open_in_memory(name: impl Into<String>) -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            name: name.into(),
            path: None,
            conn,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query_records(&self, re: Option<&Regex>) -> StoreResult<Vec<RawRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key, value FROM records ORDER BY key")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))
            .map_err(from_rusqlite)?;
        let mut out = Vec::new();
        for row in rows {
            let (key, value) = row.map_err(from_rusqlite)?;
            if re.map_or(true, |re| re.is_match(&key)) {
                out.push((key, value));
            }
        }
        Ok(out)
    }
}

impl Datastore for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.conn
            .prepare_cached("SELECT value FROM records WHERE key = ?1")
            .and_then(|mut stmt| stmt.query_row([key], |row| row.get(0)).optional())
            .map_err(|e| from_rusqlite(e).with_key(key))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(ExError::new(ExErrorKind::MalformedKey)
                .with_op("set")
                .with_message("empty key"));
        }
        self.conn
            .execute(
                "INSERT INTO records (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| from_rusqlite(e).with_key(key))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE key = ?1", [key])
            .map_err(|e| from_rusqlite(e).with_key(key))?;
        Ok(changed > 0)
    }

    fn scan(&self, re: &Regex) -> StoreResult<Vec<RawRecord>> {
        self.query_records(Some(re))
    }

    fn records(&self) -> StoreResult<Vec<RawRecord>> {
        self.query_records(None)
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM records", [])
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn replace_all(&mut self, records: &[RawRecord]) -> StoreResult<()> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        tx.execute("DELETE FROM records", []).map_err(from_rusqlite)?;
        {
            let mut insert = tx
                .prepare("INSERT INTO records (key, value) VALUES (?1, ?2)")
                .map_err(from_rusqlite)?;
            for (key, value) in records {
                insert
                    .execute(params![key, value])
                    .map_err(|e| from_rusqlite(e).with_key(key.as_str()))?;
            }
        }
        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
