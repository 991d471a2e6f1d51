use thiserror::Error;

pub type Result<T> = std::result::Result<T, GapError>;

/// Failure modes of gap resolution, caching and selection.
///
/// Only `Input` and `LimitExceeded` are meant to reach end users. The
/// resolver absorbs `Transport`, `Validation` and `InsufficientCoverage` by
/// falling through to the next tier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GapError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid collaborator response: {0}")]
    Validation(String),

    #[error("selection limit of {limit} keywords exceeded")]
    LimitExceeded { limit: usize },

    #[error("competitor {competitor} has {found} records, need {required}")]
    InsufficientCoverage {
        competitor: String,
        found: usize,
        required: usize,
    },

    #[error("session store error: {0}")]
    Storage(String),
}

impl GapError {
    /// Whether the resolver may recover from this error by trying the next tier.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GapError::Transport(_) | GapError::Validation(_) | GapError::InsufficientCoverage { .. }
        )
    }
}

impl From<anyhow::Error> for GapError {
    fn from(err: anyhow::Error) -> Self {
        GapError::Transport(format!("{:#}", err))
    }
}

impl From<tokio::time::error::Elapsed> for GapError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        GapError::Transport("outbound call timed out".to_string())
    }
}
