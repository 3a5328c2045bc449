//! Canonical schema constants for structured logging
//!
//! These constants keep field names consistent across all crates.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Datastore identifiers
pub const FIELD_DB: &str = "db";
pub const FIELD_KEY: &str = "key";
pub const FIELD_PID: &str = "pid";
pub const FIELD_PLUGIN: &str = "plugin";

// Collection sizes
pub const FIELD_DIFF_LEN: &str = "diff_len";
pub const FIELD_RECORDS: &str = "records";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
