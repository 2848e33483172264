use crate::tick::BufferId;
use thiserror::Error;

/// Core error types for bufsync.
///
/// Backend failures are deferred: they surface on the first fetch of a
/// parse response, never when the request is started.
///
/// # Examples
///
/// ```
/// use bufsync_core::error::{BufsyncError, Result};
///
/// fn fetch(ok: bool) -> Result<()> {
///     if !ok {
///         return Err(BufsyncError::Backend {
///             event: "FileReadyToParse".into(),
///             message: "no semantic completer".into(),
///         });
///     }
///     Ok(())
/// }
///
/// assert!(fetch(false).is_err());
/// ```
#[derive(Error, Debug)]
pub enum BufsyncError {
    #[error("backend request {event} failed: {message}")]
    Backend { event: String, message: String },

    #[error("backend requires confirmation: {0}")]
    ConfirmationRequired(String),

    #[error("backend request {event} timed out after {timeout_ms}ms")]
    Timeout { event: String, timeout_ms: u64 },

    #[error("backend task for {event} did not complete: {reason}")]
    TaskAborted { event: String, reason: String },

    #[error("parse request {event} was never started")]
    RequestNotStarted { event: String },

    #[error("no active parse request for buffer {0}")]
    NoActiveRequest(BufferId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BufsyncError {
    /// Returns true for errors raised by the backend itself rather than by
    /// local bookkeeping.
    pub const fn is_backend_error(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. }
                | Self::ConfirmationRequired(_)
                | Self::Timeout { .. }
                | Self::TaskAborted { .. }
        )
    }
}

/// Convenience type alias for `Result<T, BufsyncError>`.
pub type Result<T> = std::result::Result<T, BufsyncError>;
