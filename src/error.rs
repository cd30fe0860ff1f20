//! Runner error types

use thiserror::Error;

use crate::event::Event;

/// Errors surfaced by registration, `run`, and `resume`.
///
/// Requesting a stop is never an error; stops complete gracefully through
/// the remaining finalization events. Errors returned by user callbacks are
/// propagated to the caller unmodified, with no retry or suppression.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("max_epoch must be at least 1")]
    InvalidMaxEpoch,

    #[error("cannot cycle an empty batch sequence")]
    EmptyBatches,

    #[error("batch transforms may only be registered on {expected}, not {got}")]
    CallbackMismatch { expected: Event, got: Event },

    #[error("metric not found in run state: {0}")]
    MissingMetric(String),

    #[error("no value available for reducer: {0}")]
    MissingValue(String),

    #[error("cannot resume: {0}")]
    InvalidResumeState(String),

    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Handler(String),
}

/// Result type for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_mismatch_message() {
        let err = RunnerError::CallbackMismatch {
            expected: Event::BatchStarted,
            got: Event::Finished,
        };
        assert_eq!(
            err.to_string(),
            "batch transforms may only be registered on BatchStarted, not Finished"
        );
    }

    #[test]
    fn test_missing_metric_message() {
        let err = RunnerError::MissingMetric("loss".into());
        assert!(err.to_string().contains("loss"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RunnerError = io.into();
        assert!(matches!(err, RunnerError::Io(_)));
    }
}
