use thiserror::Error;

use crate::protocol::Protocol;

/// Failure talking to the question-answering backend.
///
/// The dispatcher folds every variant into one user-facing error message;
/// the variants only exist so the cause can be logged.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not reach backend at {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("backend returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl BackendError {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Transport { .. } => "transport",
            BackendError::Status { .. } => "status",
            BackendError::Decode { .. } => "decode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("{0} cannot be compared with itself")]
    SameProtocol(Protocol),
}
