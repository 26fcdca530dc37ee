//! Error type for the voice capture pipeline.

use parley_chat::ChatError;
use parley_core::error::ParleyError;

/// Errors from the voice pipeline.
///
/// Wraps the underlying subsystem errors so callers can still match on the
/// concrete condition (capture unavailable, ask already in flight, ...).
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// From the capture device, clip store, transcriber, or state machine.
    #[error(transparent)]
    Core(#[from] ParleyError),
    /// From the request orchestrator.
    #[error(transparent)]
    Chat(#[from] ChatError),
}
