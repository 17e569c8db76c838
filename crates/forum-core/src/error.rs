use std::time::Duration;

/// Failures surfaced by the forum services.
///
/// Validation errors are raised before any store access. Failures of
/// best-effort secondary writes never appear here; they are logged instead.
#[derive(Debug, thiserror::Error)]
pub enum ForumError {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("moderator privileges required")]
    Forbidden,

    #[error("sending too fast, input re-enabled in {}s", notice.as_secs())]
    RateLimited { notice: Duration },

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ForumError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, ForumError>;
