use thiserror::Error;

use crate::protocol::ConversionDirection;

pub type Result<T> = std::result::Result<T, PlaygroundError>;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("execution worker already initialized")]
    AlreadyInitialized,

    #[error("runtime environment not ready")]
    NotInitialized,

    #[error("runtime failed to load")]
    InitializationFailed,

    #[error("no initialization reply from the worker after {millis}ms")]
    InitializationTimeout { millis: u64 },

    #[error("execution worker is gone")]
    WorkerUnavailable,

    #[error("an execution session is already active")]
    SessionActive,

    #[error("no execution session is active")]
    NoActiveSession,

    #[error("execution is not suspended")]
    NotSuspended,

    #[error("worker did not consume control command {code} within {millis}ms")]
    CommandNotConsumed { code: i32, millis: u64 },

    #[error("no {} code provided", .direction.source_language())]
    EmptySource { direction: ConversionDirection },

    #[error("conversion timeout - no reply after {millis}ms")]
    ConversionTimeout { millis: u64 },

    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
