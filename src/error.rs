use thiserror::Error;

pub type OptResult<T> = Result<T, OptimizerError>;

/// Errors surfaced by one optimization call.
///
/// Rule failures are not errors: a rule whose check rejects the binding, or
/// whose transform produces no candidates, simply contributes nothing.
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// The input tree violates a structural pre-condition, e.g. an operator
    /// with the wrong number of children. Fatal for this call.
    #[error("binding invariant violated: {0}")]
    BindingInvariant(String),

    /// Exhaustive search finished without a physical winner for the root
    /// required property set. Carries the explored state of the root group
    /// for diagnostics.
    #[error("no physical plan found: {0}")]
    NoPhysicalPlan(String),

    /// The caller raised the abort flag.
    #[error("optimization cancelled")]
    Cancelled,

    /// The optimization deadline passed before a winner was found.
    #[error("optimization deadline exceeded")]
    DeadlineExceeded,

    /// Raised by the catalog accessor, wrapped and surfaced.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Memo corruption or an unreachable match. Indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OptimizerError {
    pub fn binding<S: Into<String>>(msg: S) -> Self {
        OptimizerError::BindingInvariant(msg.into())
    }

    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        OptimizerError::Catalog(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        OptimizerError::Internal(msg.into())
    }
}
