//! Error types for request orchestration and the handoff workflow.

use parley_core::error::ParleyError;

/// Errors from the chat layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("a request is already in flight")]
    Busy,
    #[error("a ticket submission is already in flight")]
    TicketInFlight,
    #[error("handoff is not awaiting a ticket")]
    NotAwaitingTicket,
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("invalid handoff transition: {0}")]
    InvalidTransition(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ParleyError> for ChatError {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::Network(msg) => ChatError::Network(msg),
            ParleyError::MalformedResponse(msg) => ChatError::Malformed(msg),
            other => ChatError::Storage(other.to_string()),
        }
    }
}
