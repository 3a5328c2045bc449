//! Error helpers for cfgstore-store
//!
//! Everything surfaces as `ExError`; SQLite and filesystem failures map to
//! `StoreIo` and `Io` respectively.

use cfgstore_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// A migration failed to apply
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::StoreIo)
        .with_op("migration")
        .with_message(format!("migration {} failed: {}", migration_id, reason))
}

/// An applied migration no longer matches the embedded SQL
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::StoreIo)
        .with_op("migration_checksum")
        .with_message(format!(
            "checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Map a rusqlite error; the SQLite extended code becomes the sub code
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let sub_code = match &err {
        rusqlite::Error::SqliteFailure(e, _) => e.extended_code,
        _ => 0,
    };
    ExError::new(ExErrorKind::StoreIo)
        .with_op("sqlite")
        .with_sub_code(sub_code)
        .with_message(err.to_string())
}

/// Map a filesystem error; the OS errno becomes the sub code
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation)
        .with_sub_code(err.raw_os_error().unwrap_or(0))
        .with_message(err.to_string())
}

/// A document could not be (de)serialized
pub fn serialization_error(operation: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation)
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_errno() {
        let err = io_error(
            "read_document",
            std::io::Error::from_raw_os_error(2),
        );
        assert_eq!(err.kind(), ExErrorKind::Io);
        assert_eq!(err.sub_code(), 2);
        assert_eq!(err.op(), Some("read_document"));
    }

    #[test]
    fn test_rusqlite_maps_to_store_io() {
        let err = from_rusqlite(rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), ExErrorKind::StoreIo);
        assert_eq!(err.sub_code(), 0);
    }
}
