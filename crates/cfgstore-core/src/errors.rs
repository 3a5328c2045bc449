use cfgstore_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using CfgError
pub type Result<T> = std::result::Result<T, CfgError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure a client can observe maps to one of these kinds. The
/// stable code is what travels in a client reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Encoding / key language
    MalformedEncoding,
    MalformedKey,
    InvalidValue,

    // Schema
    SchemaParse,
    SchemaMismatch,
    SchemaNotFound,
    MissingUniqueVariable,

    // Document mapping
    /// The datastore rejected a write while mapping a document
    WriteFailure,

    // Transactions
    LockConflict,
    ValidateFailed,
    CommitFailed,
    Timeout,

    // Integration/IO
    StoreIo,
    Io,
    Serialization,
    Config,

    // Request shape
    InvalidInput,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::MalformedEncoding => "ERR_MALFORMED_ENCODING",
            ExErrorKind::MalformedKey => "ERR_MALFORMED_KEY",
            ExErrorKind::InvalidValue => "ERR_INVALID_VALUE",
            ExErrorKind::SchemaParse => "ERR_SCHEMA_PARSE",
            ExErrorKind::SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            ExErrorKind::SchemaNotFound => "ERR_SCHEMA_NOT_FOUND",
            ExErrorKind::MissingUniqueVariable => "ERR_MISSING_UNIQUE_VARIABLE",
            ExErrorKind::WriteFailure => "ERR_WRITE_FAILURE",
            ExErrorKind::LockConflict => "ERR_LOCK_CONFLICT",
            ExErrorKind::ValidateFailed => "ERR_VALIDATE_FAILED",
            ExErrorKind::CommitFailed => "ERR_COMMIT_FAILED",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::StoreIo => "ERR_STORE_IO",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// The failure changed no state and the caller may carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExErrorKind::MalformedEncoding
                | ExErrorKind::MalformedKey
                | ExErrorKind::InvalidValue
                | ExErrorKind::SchemaMismatch
                | ExErrorKind::SchemaNotFound
                | ExErrorKind::MissingUniqueVariable
                | ExErrorKind::LockConflict
        )
    }
}

/// Canonical structured error type
///
/// Carries the classification used in client replies (kind, numeric
/// sub-code, message) plus context for logs.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    key: Option<String>,
    plugin: Option<String>,
    sub_code: i32,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            key: None,
            plugin: None,
            sub_code: 0,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the datastore key the error refers to
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Name the plugin that produced the failure
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Set the numeric sub-code reported to clients
    pub fn with_sub_code(mut self, sub_code: i32) -> Self {
        self.sub_code = sub_code;
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn sub_code(&self) -> i32 {
        self.sub_code
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(plugin) = &self.plugin {
            write!(f, " (plugin: {})", plugin)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by the codec, key language and schema layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CfgError {
    /// A record value could not be decoded (or encoded)
    #[error("Malformed record encoding: {reason}")]
    MalformedEncoding { reason: String },

    /// A key does not follow the dotted key grammar
    #[error("Malformed key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    /// Text could not be parsed as a value of the given type
    #[error("Invalid {type_name} value: '{text}'")]
    InvalidValue { type_name: String, text: String },

    /// A type name in a key-spec is not known
    #[error("Unknown value type: {name}")]
    UnknownType { name: String },

    /// A key-spec source could not be parsed
    #[error("Schema parse error at line {line}: {reason}")]
    SchemaParse { line: usize, reason: String },

    /// No schema entry matches the key
    #[error("No schema entry for key: {key}")]
    SchemaNotFound { key: String },

    /// A variable disagrees with its schema declaration
    #[error("Variable '{variable}' of {key} does not match schema: {reason}")]
    SchemaMismatch {
        key: String,
        variable: String,
        reason: String,
    },

    /// A list entry lacks one of its identity variables
    #[error("List entry {key} is missing unique variable '{variable}'")]
    MissingUniqueVariable { key: String, variable: String },

    /// A pattern produced an invalid regular expression
    #[error("Invalid scan expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

/// Conversion from CfgError to ExError
impl From<CfgError> for ExError {
    fn from(err: CfgError) -> Self {
        let message = err.to_string();
        match err {
            CfgError::MalformedEncoding { .. } => {
                ExError::new(ExErrorKind::MalformedEncoding).with_message(message)
            }
            CfgError::MalformedKey { key, .. } => ExError::new(ExErrorKind::MalformedKey)
                .with_key(key)
                .with_message(message),
            CfgError::InvalidValue { .. } | CfgError::UnknownType { .. } => {
                ExError::new(ExErrorKind::InvalidValue).with_message(message)
            }
            CfgError::SchemaParse { line, .. } => ExError::new(ExErrorKind::SchemaParse)
                .with_sub_code(i32::try_from(line).unwrap_or(i32::MAX))
                .with_message(message),
            CfgError::SchemaNotFound { key } => ExError::new(ExErrorKind::SchemaNotFound)
                .with_key(key)
                .with_message(message),
            CfgError::SchemaMismatch { key, .. } => ExError::new(ExErrorKind::SchemaMismatch)
                .with_key(key)
                .with_message(message),
            CfgError::MissingUniqueVariable { key, .. } => {
                ExError::new(ExErrorKind::MissingUniqueVariable)
                    .with_key(key)
                    .with_message(message)
            }
            CfgError::InvalidRegex { pattern, .. } => ExError::new(ExErrorKind::MalformedKey)
                .with_key(pattern)
                .with_message(message),
        }
    }
}

/// Conversion from serde_json::Error to ExError
impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_error_kind_codes() {
        let cases = [
            (ExErrorKind::LockConflict, "ERR_LOCK_CONFLICT"),
            (ExErrorKind::ValidateFailed, "ERR_VALIDATE_FAILED"),
            (ExErrorKind::CommitFailed, "ERR_COMMIT_FAILED"),
            (ExErrorKind::Timeout, "ERR_TIMEOUT"),
            (ExErrorKind::StoreIo, "ERR_STORE_IO"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_store_io_is_not_recoverable() {
        assert!(!ExErrorKind::StoreIo.is_recoverable());
        assert!(!ExErrorKind::WriteFailure.is_recoverable());
        assert!(ExErrorKind::SchemaNotFound.is_recoverable());
        assert!(ExErrorKind::MissingUniqueVariable.is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::CommitFailed)
            .with_op("commit")
            .with_plugin("routing")
            .with_key("interface.0")
            .with_message("route table full");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_COMMIT_FAILED] in operation 'commit'"));
        assert!(text.contains("route table full"));
        assert!(text.contains("(plugin: routing)"));
        assert!(text.contains("(key: interface.0)"));
    }

    #[test]
    fn test_cfg_error_conversion_keeps_key() {
        let err: ExError = CfgError::SchemaNotFound {
            key: "system.bogus".into(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::SchemaNotFound);
        assert_eq!(err.key(), Some("system.bogus"));
    }

    #[test]
    fn test_sub_code_defaults_to_zero() {
        let err = ExError::new(ExErrorKind::InvalidInput);
        assert_eq!(err.sub_code(), 0);
        assert_eq!(err.with_sub_code(17).sub_code(), 17);
    }
}
