//! Store diff engine
//!
//! Compares two datastores record by record. List entries are paired by
//! identity rather than by key, since the same entry may sit at different
//! indices in the two stores.
//!
//! ## Guarantees
//!
//! - **Determinism**: entries are ordered by identity.
//! - **Value equality**: records are compared decoded, as unordered variable
//!   sets; records that only differ in encoding order are not reported.

pub mod engine;
pub mod model;
pub mod summary;

pub use engine::diff;
pub use model::{ChangeOp, Diff, DiffEntry, DiffOp};
pub use summary::render_summary;
