//! Datastore locks
//!
//! Only candidate can be locked. The holder is a client pid; pid 0 never
//! holds a lock. Acquisition is a non-blocking check-and-set.

use crate::datastores::DbName;
use cfgstore_core::errors::{ExError, ExErrorKind};

pub type Pid = u32;

#[derive(Debug, Default)]
pub struct LockTable {
    candidate: Option<Pid>,
}

fn sub_code(pid: Pid) -> i32 {
    i32::try_from(pid).unwrap_or(i32::MAX)
}

fn lockable(db: DbName, op: &str) -> Result<(), ExError> {
    match db {
        DbName::Candidate => Ok(()),
        DbName::Running => Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op(op)
            .with_message("can not lock running, only candidate")),
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `pid`; taking a lock already held is a no-op
    pub fn lock(&mut self, db: DbName, pid: Pid) -> Result<(), ExError> {
        lockable(db, "lock")?;
        if pid == 0 {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("lock")
                .with_message("pid 0 can not hold a lock"));
        }
        match self.candidate {
            Some(holder) if holder != pid => Err(conflict("lock", holder)),
            _ => {
                self.candidate = Some(pid);
                tracing::debug!(db = %db, pid, "lock taken");
                Ok(())
            }
        }
    }

    /// Release the lock held by `pid`; an unlocked store unlocks fine
    pub fn unlock(&mut self, db: DbName, pid: Pid) -> Result<(), ExError> {
        lockable(db, "unlock")?;
        match self.candidate {
            Some(holder) if holder != pid => Err(conflict("unlock", holder)),
            Some(_) => {
                self.candidate = None;
                tracing::debug!(db = %db, pid, "lock released");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn holder(&self, db: DbName) -> Option<Pid> {
        match db {
            DbName::Candidate => self.candidate,
            DbName::Running => None,
        }
    }

    /// Fail unless `pid` may change `db`: nobody else holds its lock
    pub fn check_writable(&self, db: DbName, pid: Pid) -> Result<(), ExError> {
        match self.holder(db) {
            Some(holder) if holder != pid => Err(conflict("lock", holder)),
            _ => Ok(()),
        }
    }

    /// Drop every lock `pid` holds, reporting whether it held any
    pub fn release_pid(&mut self, pid: Pid) -> bool {
        if self.candidate == Some(pid) {
            self.candidate = None;
            tracing::info!(pid, "locks of departed client released");
            true
        } else {
            false
        }
    }
}

fn conflict(op: &str, holder: Pid) -> ExError {
    ExError::new(ExErrorKind::LockConflict)
        .with_op(op)
        .with_sub_code(sub_code(holder))
        .with_message(format!("{} failed: locked by {}", op, holder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_protocol() {
        let mut locks = LockTable::new();
        locks.lock(DbName::Candidate, 1).unwrap();
        locks.lock(DbName::Candidate, 1).unwrap();

        let err = locks.lock(DbName::Candidate, 2).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::LockConflict);
        assert_eq!(err.sub_code(), 1);
        assert_eq!(err.message(), "lock failed: locked by 1");

        let err = locks.unlock(DbName::Candidate, 2).unwrap_err();
        assert_eq!(err.message(), "unlock failed: locked by 1");

        locks.unlock(DbName::Candidate, 1).unwrap();
        locks.lock(DbName::Candidate, 2).unwrap();
        assert_eq!(locks.holder(DbName::Candidate), Some(2));
    }

    #[test]
    fn test_running_is_not_lockable() {
        let mut locks = LockTable::new();
        let err = locks.lock(DbName::Running, 1).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.message(), "can not lock running, only candidate");
        assert!(locks.unlock(DbName::Running, 1).is_err());
    }

    #[test]
    fn test_unlock_of_unlocked_store_succeeds() {
        let mut locks = LockTable::new();
        assert!(locks.unlock(DbName::Candidate, 5).is_ok());
    }

    #[test]
    fn test_release_pid() {
        let mut locks = LockTable::new();
        locks.lock(DbName::Candidate, 3).unwrap();
        assert!(!locks.release_pid(4));
        assert!(locks.release_pid(3));
        assert_eq!(locks.holder(DbName::Candidate), None);
        assert!(locks.check_writable(DbName::Candidate, 9).is_ok());
    }
}
