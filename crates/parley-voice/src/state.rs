//! Voice capture state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for the capture lifecycle:
//! - Idle -> Recording (capture started)
//! - Recording -> Transcribing (capture finished, transcription running)
//! - Recording -> Idle (capture cancelled)
//! - Transcribing -> Idle (pipeline done, success or failure)

use std::fmt;
use std::sync::{Arc, Mutex};

use parley_core::error::ParleyError;

/// Operational state of the voice capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceState {
    /// No capture in progress. Ready to record.
    Idle,
    /// Actively recording from the input device.
    Recording,
    /// Converting the finished clip into text.
    Transcribing,
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState::Idle
    }
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceState::Idle => write!(f, "idle"),
            VoiceState::Recording => write!(f, "recording"),
            VoiceState::Transcribing => write!(f, "transcribing"),
        }
    }
}

impl VoiceState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &VoiceState) -> bool {
        matches!(
            (self, target),
            (VoiceState::Idle, VoiceState::Recording)
                | (VoiceState::Recording, VoiceState::Transcribing)
                | (VoiceState::Recording, VoiceState::Idle)
                | (VoiceState::Transcribing, VoiceState::Idle)
        )
    }
}

/// Thread-safe state machine for the capture lifecycle.
///
/// All transitions are validated before being applied. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct VoiceMachine {
    state: Arc<Mutex<VoiceState>>,
}

impl VoiceMachine {
    /// Create a new machine in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn current(&self) -> VoiceState {
        *self.state.lock().expect("voice state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: VoiceState) -> Result<(), ParleyError> {
        let mut state = self.state.lock().expect("voice state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Voice state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(ParleyError::Voice(format!(
                "invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Force the machine back to idle (used for error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("voice state mutex poisoned");
        if *state != VoiceState::Idle {
            tracing::debug!("Voice state machine reset to idle from {}", *state);
            *state = VoiceState::Idle;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
