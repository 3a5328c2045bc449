//! Schema index
//!
//! Maps concrete keys to the declared variable specification of the pattern
//! they instantiate. The index is built once from a key-spec source and is
//! read-only afterwards.

pub mod entry;
pub mod index;
pub mod parser;

pub use entry::{SchemaEntry, VarSpec};
pub use index::{SchemaIndex, SchemaWarning};
pub use parser::{load_key_spec, parse_key_spec};
