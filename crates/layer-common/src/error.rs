//! Error types for layer editor operations.

use thiserror::Error;

use crate::message::MessageKind;
use crate::validation::ValidationError;

/// Result type alias using EditorError.
pub type EditorResult<T> = Result<T, EditorError>;

/// Primary error type for layer editor operations.
#[derive(Debug, Error)]
pub enum EditorError {
    // === User Input Errors ===
    #[error("Draft failed validation with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    // === Capability Service Errors ===
    #[error("Service requires credentials")]
    AuthRequired,

    #[error("Capability request timed out")]
    Timeout,

    #[error("Could not connect to service: {0}")]
    Connection(String),

    #[error("Service response was not a capabilities document: {0}")]
    Unparseable(String),

    #[error("Capability service failed with status {status}: {message}")]
    Service { status: u16, message: String },

    // === Persistence Errors ===
    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    // === Programmer Errors ===
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// The result arrived after a newer operation replaced the state it was
    /// started against.
    #[error("Result superseded by a newer operation")]
    Superseded,
}

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Recoverable, blocks save, shown as a list.
    UserInput,
    /// Timeouts and malformed service answers; the user may retry.
    TransientService,
    /// Opens the credentials section instead of a generic error.
    Auth,
    /// Save or delete failed; the draft is kept as it was.
    FatalPersistence,
    /// Logged and aborted without touching state.
    InvariantViolation,
}

impl EditorError {
    /// Get the error class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            EditorError::Validation(_) => ErrorClass::UserInput,
            EditorError::AuthRequired => ErrorClass::Auth,
            EditorError::Timeout
            | EditorError::Connection(_)
            | EditorError::Unparseable(_)
            | EditorError::Service { .. } => ErrorClass::TransientService,
            EditorError::Persistence(_) | EditorError::LayerNotFound(_) => {
                ErrorClass::FatalPersistence
            }
            EditorError::InvariantViolation(_) | EditorError::Superseded => {
                ErrorClass::InvariantViolation
            }
        }
    }

    /// Get the message kind a user-facing notification for this error uses.
    ///
    /// Generic service failures are errors; the retryable capability
    /// failures and authentication prompts are warnings.
    pub fn message_kind(&self) -> MessageKind {
        match self {
            EditorError::AuthRequired
            | EditorError::Timeout
            | EditorError::Connection(_)
            | EditorError::Unparseable(_) => MessageKind::Warning,
            _ => MessageKind::Error,
        }
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        EditorError::InvariantViolation(format!("JSON error: {}", err))
    }
}
