//! cfgstore core - configuration datastore engine
//!
//! This crate provides the schema-aware layers above a flat key/value store:
//! - Record value codec and the dotted key language with list markers
//! - Schema index built from key-spec text
//! - Mapping between flat records and a hierarchical document tree
//! - Identity-aware store diff
//! - Weighted plugin dependency graph driven by a diff
//!
//! Persistence and the transaction pipeline live in `cfgstore-store` and
//! `cfgstore-engine`.

pub mod codec;
pub mod depgraph;
pub mod diff;
pub mod document;
pub mod errors;
pub mod keylang;
pub mod logging_facility;
pub mod mapper;
pub mod schema;
pub mod store;
pub mod value;

// Re-export commonly used types
pub use depgraph::{DepGraph, HookBinding, Phase, TransactionData};
pub use diff::{diff, Diff, DiffEntry, DiffOp};
pub use document::Document;
pub use errors::{CfgError, ExError, ExErrorKind, Result};
pub use schema::{SchemaEntry, SchemaIndex};
pub use store::{Datastore, MemoryStore};
pub use value::{Value, ValueType, Variable};
