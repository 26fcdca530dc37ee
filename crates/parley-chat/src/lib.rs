//! Parley chat crate - request orchestration and the human-handoff workflow.
//!
//! Dispatches user questions to the support backend, classifies replies
//! (plain answer, structured order record, or escalation trigger), appends
//! the resulting messages to the session store, and drives the support
//! ticket handoff state machine.

pub mod backend;
pub mod error;
pub mod handoff;
pub mod orchestrator;
pub mod response;

pub use backend::{AskReply, HttpSupportBackend, MockSupportBackend, SupportBackend};
pub use error::ChatError;
pub use handoff::{HandoffMachine, HandoffState, HandoffTicket, TicketStatus};
pub use orchestrator::{AskOutcome, RequestOrchestrator, TicketOutcome};
pub use response::{format_order_summary, is_escalation, ESCALATION_TRIGGERS};
