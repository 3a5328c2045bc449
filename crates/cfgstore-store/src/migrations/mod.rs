//! Migration framework
//!
//! Embedded SQL migrations applied once each, in order, with their SHA256
//! recorded so later edits to an applied migration are detected.

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
