//! cfgstore engine - the backend side of the datastore
//!
//! Provides:
//! - `Options` read from a TOML file
//! - The candidate lock table
//! - The plugin registry with lifecycle hooks and dependencies
//! - The transaction coordinator (validate, commit, promote)
//! - `Backend`, which executes client requests against the two datastores

pub mod backend;
pub mod datastores;
pub mod locks;
pub mod options;
pub mod plugins;
pub mod transaction;

pub use backend::{Backend, BackendSettings, ClientReply, ClientRequest, EditOp};
pub use datastores::{DbName, Datastores};
pub use locks::{LockTable, Pid};
pub use options::Options;
pub use plugins::{PluginRegistry, TransactionHooks, TransactionInfo};
pub use transaction::{Coordinator, TransactionContext, TransactionOutcome, TransactionState};
