//! Handoff state machine for escalation to a human agent.
//!
//! Enforces valid transitions for the ticket lifecycle:
//! - idle -> awaiting-ticket (escalation trigger classified)
//! - awaiting-ticket -> submitting (ticket submitted)
//! - submitting -> submitted -> idle (acknowledged)
//! - submitting -> failed -> awaiting-ticket (retry-friendly failure)

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::ChatError;

/// State of the escalation-to-human workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandoffState {
    /// No escalation in progress.
    Idle,
    /// The ticket form is open, waiting for the user to submit.
    AwaitingTicket,
    /// A ticket submission is in flight.
    Submitting,
    /// The backend acknowledged the ticket.
    Submitted,
    /// The submission failed; the form stays open for retry.
    Failed,
}

impl Default for HandoffState {
    fn default() -> Self {
        HandoffState::Idle
    }
}

impl fmt::Display for HandoffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffState::Idle => write!(f, "idle"),
            HandoffState::AwaitingTicket => write!(f, "awaiting-ticket"),
            HandoffState::Submitting => write!(f, "submitting"),
            HandoffState::Submitted => write!(f, "submitted"),
            HandoffState::Failed => write!(f, "failed"),
        }
    }
}

impl HandoffState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &HandoffState) -> bool {
        matches!(
            (self, target),
            (HandoffState::Idle, HandoffState::AwaitingTicket)
                | (HandoffState::AwaitingTicket, HandoffState::Submitting)
                | (HandoffState::Submitting, HandoffState::Submitted)
                | (HandoffState::Submitting, HandoffState::Failed)
                | (HandoffState::Submitted, HandoffState::Idle)
                | (HandoffState::Failed, HandoffState::AwaitingTicket)
        )
    }
}

/// Lifecycle status of the current ticket draft, derived from the machine
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Draft,
    Submitting,
    Submitted,
    Failed,
}

/// View of the current ticket: draft fields plus derived status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffTicket {
    pub email: String,
    pub issue: String,
    pub status: TicketStatus,
}

#[derive(Debug, Default)]
struct TicketDraft {
    email: String,
    issue: String,
}

/// Thread-safe handoff state machine with the current ticket draft.
///
/// All transitions are validated before being applied. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct HandoffMachine {
    state: Arc<Mutex<HandoffState>>,
    draft: Arc<Mutex<TicketDraft>>,
}

impl HandoffMachine {
    /// Create a new machine in the idle state with an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn current(&self) -> HandoffState {
        *self.state.lock().expect("handoff state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: HandoffState) -> Result<(), ChatError> {
        let mut state = self.state.lock().expect("handoff state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Handoff state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition(format!(
                "{} -> {}",
                *state, target
            )))
        }
    }

    /// Open the ticket form after an escalation trigger.
    ///
    /// Only transitions from idle; a trigger while the form is already open
    /// (or a submission is in flight) leaves the state alone. Returns whether
    /// the machine moved.
    pub fn trigger(&self) -> bool {
        let mut state = self.state.lock().expect("handoff state mutex poisoned");
        if *state == HandoffState::Idle {
            tracing::debug!("Handoff state: idle -> awaiting-ticket");
            *state = HandoffState::AwaitingTicket;
            true
        } else {
            tracing::debug!(state = %*state, "Escalation trigger while handoff already active");
            false
        }
    }

    /// Record the draft fields for the in-flight or retryable ticket.
    pub fn set_draft(&self, email: &str, issue: &str) {
        let mut draft = self.draft.lock().expect("handoff draft mutex poisoned");
        draft.email = email.to_string();
        draft.issue = issue.to_string();
    }

    /// Reset the draft to empty fields.
    pub fn clear_draft(&self) {
        let mut draft = self.draft.lock().expect("handoff draft mutex poisoned");
        draft.email.clear();
        draft.issue.clear();
    }

    /// Snapshot the ticket with its derived status.
    pub fn ticket(&self) -> HandoffTicket {
        let draft = self.draft.lock().expect("handoff draft mutex poisoned");
        let status = match self.current() {
            HandoffState::Idle | HandoffState::AwaitingTicket => TicketStatus::Draft,
            HandoffState::Submitting => TicketStatus::Submitting,
            HandoffState::Submitted => TicketStatus::Submitted,
            HandoffState::Failed => TicketStatus::Failed,
        };
        HandoffTicket {
            email: draft.email.clone(),
            issue: draft.issue.clone(),
            status,
        }
    }

    /// Force the machine back to idle and drop the draft (error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("handoff state mutex poisoned");
        tracing::warn!("Handoff machine reset to idle from {}", *state);
        *state = HandoffState::Idle;
        drop(state);
        self.clear_draft();
    }
}

// =============================================================================
// Tests
// =============================================================================
