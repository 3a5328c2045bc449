use crate::diff::ChangeOp;
use crate::value::Variable;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a plugin hook
///
/// `sub_code` is passed through to the client reply unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    pub sub_code: i32,
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sub_code: 0,
            message: message.into(),
        }
    }

    pub fn with_sub_code(mut self, sub_code: i32) -> Self {
        self.sub_code = sub_code;
        self
    }
}

/// Input handed to a hook for one matched diff entry
///
/// `source` is the old state (running) and `target` the new one
/// (candidate). The matched keys are the full keys for key dependencies and
/// the matched prefix for tree dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionData {
    pub plugin: String,
    pub op: ChangeOp,
    pub source_db: String,
    pub target_db: String,
    pub source_key: Option<String>,
    pub target_key: Option<String>,
    pub matched_source_key: Option<String>,
    pub matched_target_key: Option<String>,
    pub source_vars: Option<Vec<Variable>>,
    pub target_vars: Option<Vec<Variable>>,
}

pub trait ValidateHook {
    fn validate(&self, data: &TransactionData) -> Result<(), HookError>;
}

pub trait CommitHook {
    fn commit(&self, data: &TransactionData) -> Result<(), HookError>;
}

/// Pipeline phase a resolution is made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validate,
    Commit,
}

/// The callbacks behind a dependency descriptor
#[derive(Clone)]
pub enum HookBinding {
    Validate(Arc<dyn ValidateHook>),
    Commit(Arc<dyn CommitHook>),
    Both(Arc<dyn ValidateHook>, Arc<dyn CommitHook>),
}

impl HookBinding {
    pub fn validate<H: ValidateHook + 'static>(hook: H) -> Self {
        HookBinding::Validate(Arc::new(hook))
    }

    pub fn commit<H: CommitHook + 'static>(hook: H) -> Self {
        HookBinding::Commit(Arc::new(hook))
    }

    /// Bind one object for both phases
    pub fn both<H: ValidateHook + CommitHook + 'static>(hook: H) -> Self {
        let hook = Arc::new(hook);
        HookBinding::Both(hook.clone(), hook)
    }

    pub fn serves(&self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (HookBinding::Validate(_), Phase::Validate)
                | (HookBinding::Commit(_), Phase::Commit)
                | (HookBinding::Both(..), _)
        )
    }

    /// Run the callback for `phase`; a binding that does not serve the
    /// phase succeeds without doing anything
    pub fn invoke(&self, phase: Phase, data: &TransactionData) -> Result<(), HookError> {
        match (self, phase) {
            (HookBinding::Validate(h), Phase::Validate) | (HookBinding::Both(h, _), Phase::Validate) => {
                h.validate(data)
            }
            (HookBinding::Commit(h), Phase::Commit) | (HookBinding::Both(_, h), Phase::Commit) => {
                h.commit(data)
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            HookBinding::Validate(_) => "Validate",
            HookBinding::Commit(_) => "Commit",
            HookBinding::Both(..) => "Both",
        };
        f.debug_tuple("HookBinding").field(&kind).finish()
    }
}
