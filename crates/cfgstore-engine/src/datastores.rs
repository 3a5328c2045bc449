//! The two datastores a backend serves

use cfgstore_core::errors::{ExError, ExErrorKind};
use cfgstore_core::store::{Datastore, MemoryStore};
use cfgstore_store::SqliteStore;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbName {
    Running,
    Candidate,
}

impl DbName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbName::Running => "running",
            DbName::Candidate => "candidate",
        }
    }
}

impl fmt::Display for DbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbName {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(DbName::Running),
            "candidate" => Ok(DbName::Candidate),
            other => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_message(format!("no such datastore: {}", other))),
        }
    }
}

/// Candidate and running, behind the `Datastore` interface
pub struct Datastores {
    candidate: Box<dyn Datastore>,
    running: Box<dyn Datastore>,
}

impl Datastores {
    pub fn new(candidate: Box<dyn Datastore>, running: Box<dyn Datastore>) -> Self {
        Self { candidate, running }
    }

    /// Open both stores as SQLite files
    pub fn open(candidate: &Path, running: &Path) -> Result<Self, ExError> {
        Ok(Self::new(
            Box::new(SqliteStore::open(DbName::Candidate.as_str(), candidate)?),
            Box::new(SqliteStore::open(DbName::Running.as_str(), running)?),
        ))
    }

    pub fn in_memory() -> Self {
        Self::new(
            Box::new(MemoryStore::new(DbName::Candidate.as_str())),
            Box::new(MemoryStore::new(DbName::Running.as_str())),
        )
    }

    pub fn get(&self, db: DbName) -> &dyn Datastore {
        match db {
            DbName::Running => self.running.as_ref(),
            DbName::Candidate => self.candidate.as_ref(),
        }
    }

    pub fn candidate(&self) -> &dyn Datastore {
        self.candidate.as_ref()
    }

    pub fn candidate_mut(&mut self) -> &mut dyn Datastore {
        self.candidate.as_mut()
    }

    pub fn running(&self) -> &dyn Datastore {
        self.running.as_ref()
    }

    /// Borrow candidate for reading and running for writing at once
    pub fn split_for_commit(&mut self) -> (&dyn Datastore, &mut dyn Datastore) {
        (self.candidate.as_ref(), self.running.as_mut())
    }

    /// Borrow running for reading and candidate for writing at once
    pub fn split_for_reset(&mut self) -> (&dyn Datastore, &mut dyn Datastore) {
        (self.running.as_ref(), self.candidate.as_mut())
    }
}

impl fmt::Debug for Datastores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastores")
            .field("candidate", &self.candidate.name())
            .field("running", &self.running.name())
            .finish()
    }
}
