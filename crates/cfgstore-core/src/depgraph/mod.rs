//! Plugin dependency graph
//!
//! Plugins register interest in key patterns together with a weight. Given
//! a diff, the graph resolves which hooks to invoke for which entries, in
//! ascending weight order with ties kept in registration order.

mod graph;
mod hooks;

pub use graph::{DepGraph, DepHandle, DepPattern, DepType, Descriptor, Invocation, UNWEIGHTED};
pub use hooks::{CommitHook, HookBinding, HookError, Phase, TransactionData, ValidateHook};
