//! Unified error handling for the odometer engine and its collaborators.
//!
//! Filtering decisions (stale, unknown accuracy, implausible jumps, tracking
//! disabled) are *not* errors; they are reported as
//! [`IngestOutcome`](crate::IngestOutcome) values. Everything here is
//! recoverable: the worst case is a dropped sample.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OdometerError>;

/// Errors surfaced by the engine, the session controller, and the stores.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum OdometerError {
    /// A fix carried a latitude/longitude outside the valid ranges.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// A persisted state was rejected by `restore`.
    #[error("invalid odometer state: {reason}")]
    InvalidState { reason: String },

    /// `set_moving` was called while tracking is off.
    #[error("tracking is not enabled")]
    TrackingNotEnabled,

    /// The external location provider refused a command.
    #[error("location provider error: {message}")]
    Provider { message: String },

    /// A store failed for a reason other than I/O or encoding.
    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "persistence")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl OdometerError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        OdometerError::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        OdometerError::Provider {
            message: message.into(),
        }
    }

    /// True for errors caused by bad input rather than a failing collaborator.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            OdometerError::InvalidCoordinate { .. }
                | OdometerError::InvalidState { .. }
                | OdometerError::TrackingNotEnabled
        )
    }
}
