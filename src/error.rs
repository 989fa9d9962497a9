use crate::session::SessionState;
use thiserror::Error;
use uuid::Uuid;

/// Audio capture failures
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio device error: {0}")]
    Device(String),
}

/// Speech recognition failures
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    #[error("speech recognition permission denied")]
    PermissionDenied,

    #[error("speech recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("recognition failed: {0}")]
    RecognitionFailed(String),
}

/// Durable-store failures
///
/// Never fatal to a live session: autosave failures are logged and retried
/// on the next flush.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no stored record for meeting {0}")]
    NotFound(Uuid),
}

/// Session-level errors surfaced to callers of the controller
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("microphone or speech recognition access denied")]
    PermissionDenied,

    #[error("a recording session is already active")]
    AlreadyActive,

    #[error("cannot {action} while session is {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
