//! Hierarchical configuration document
//!
//! The tree is an arena of nodes addressed by `NodeId`. Children are owned
//! by the arena in insertion order; each node keeps a non-owning parent id.

mod render;
mod serial;
mod tree;

pub use render::{render_text, render_xml};
pub use serial::DocNode;
pub use tree::{Document, NodeId, NodeKind};

/// Name of the root element of every configuration document
pub const ROOT_ELEMENT: &str = "config";
