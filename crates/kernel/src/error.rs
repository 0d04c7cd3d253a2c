use thiserror::Error;

/// Failure conditions surfaced by kernel operations.
///
/// Each variant is a distinct condition so callers can decide per case
/// whether to retry with adjusted parameters or abort.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// A required input was missing or a parameter was out of range.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// An invariant of the data model was violated.
    #[error("internal geometry error: {reason}")]
    Internal { reason: String },

    /// The requested operator variant is intentionally not provided.
    #[error("not implemented: {what}")]
    NotImplemented { what: String },

    /// The progress tracker declined to continue.
    #[error("operation cancelled by the progress tracker")]
    UserCancelled,
}

impl KernelError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    pub fn not_implemented(what: impl Into<String>) -> Self {
        Self::NotImplemented { what: what.into() }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
