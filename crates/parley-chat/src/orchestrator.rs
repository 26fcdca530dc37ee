//! Request orchestrator: central coordinator for the conversation.
//!
//! Owns the single-flight dispatch of user questions to the support backend,
//! classification of the replies, the session's loading flag, and the
//! handoff ticket submission flow. The session and preference stores are
//! injected so tests can substitute in-memory fakes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parley_core::types::Message;
use parley_storage::{PreferenceStore, SessionStore};

use crate::backend::{AskReply, SupportBackend};
use crate::error::ChatError;
use crate::handoff::{HandoffMachine, HandoffState};
use crate::response::{format_order_summary, is_escalation};

/// Bot message appended when the backend is unreachable or unparsable.
pub const FALLBACK_REPLY: &str = "⚠️ Error: could not reach server.";

/// Bot message appended after a successful ticket submission.
pub const TICKET_THANKS_REPLY: &str =
    "Thank you! Your message has been received. A human agent will contact you soon.";

/// Bot message appended after a failed ticket submission.
pub const TICKET_FAILED_REPLY: &str = "Sorry, there was an error logging your issue.";

/// How an `ask` resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// Input was empty after trimming; nothing was sent or appended.
    Ignored,
    /// The bot replied (plain answer or order summary).
    Answered,
    /// The bot's reply triggered the human handoff flow.
    Escalated,
    /// The backend was unreachable or unparsable; the fallback reply was
    /// appended and the failure swallowed.
    Failed,
}

/// How a ticket submission resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOutcome {
    /// Acknowledged; the draft was cleared and the handoff closed.
    Submitted,
    /// Rejected or unreachable; the form stays open with the draft intact.
    Failed,
}

/// Central coordinator wiring the backend, stores, and handoff machine.
pub struct RequestOrchestrator<B> {
    backend: B,
    session: Arc<SessionStore>,
    prefs: Arc<PreferenceStore>,
    handoff: HandoffMachine,
    loading: AtomicBool,
}

impl<B: SupportBackend> RequestOrchestrator<B> {
    pub fn new(backend: B, session: Arc<SessionStore>, prefs: Arc<PreferenceStore>) -> Self {
        Self {
            backend,
            session,
            prefs,
            handoff: HandoffMachine::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// Whether a question is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// The handoff machine, for UI state queries.
    pub fn handoff(&self) -> &HandoffMachine {
        &self.handoff
    }

    /// The session store this orchestrator appends to.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The backend this orchestrator dispatches to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Dispatch a typed question.
    ///
    /// Empty input (after trimming) is a no-op. While a request is in
    /// flight, further calls are rejected with `ChatError::Busy` rather than
    /// queued. On success the reply is appended as a bot message (order
    /// payloads formatted as a fixed summary); plain answers are classified
    /// for escalation. On failure a fixed fallback bot message is appended
    /// and the error swallowed. The loading flag clears on every path.
    pub async fn ask(&self, text: &str) -> Result<AskOutcome, ChatError> {
        self.ask_with_audio(text, None).await
    }

    /// Dispatch a question whose user message carries an audio reference.
    ///
    /// Used by the voice pipeline so that transcript and clip land in a
    /// single user message; the single-flight rule is shared with `ask`.
    pub async fn ask_with_audio(
        &self,
        text: &str,
        audio_url: Option<String>,
    ) -> Result<AskOutcome, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(AskOutcome::Ignored);
        }

        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Rejecting ask while a request is in flight");
            return Err(ChatError::Busy);
        }

        let result = self.dispatch(trimmed, audio_url).await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    async fn dispatch(
        &self,
        text: &str,
        audio_url: Option<String>,
    ) -> Result<AskOutcome, ChatError> {
        let user_message = match audio_url {
            Some(url) => Message::user_with_audio(text, url),
            None => Message::user(text),
        };
        self.session.append(&user_message)?;

        let language = self.prefs.language();
        match self.backend.ask(text, &language).await {
            Ok(AskReply::Answer { answer }) => {
                self.session.append(&Message::bot(&answer))?;
                if is_escalation(&answer) {
                    self.handoff.trigger();
                    tracing::info!("Bot reply triggered human handoff");
                    Ok(AskOutcome::Escalated)
                } else {
                    Ok(AskOutcome::Answered)
                }
            }
            Ok(AskReply::Order { order }) => {
                // Order summaries are never classified for escalation.
                self.session
                    .append(&Message::bot(format_order_summary(&order)))?;
                Ok(AskOutcome::Answered)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ask request failed");
                self.session.append(&Message::bot(FALLBACK_REPLY))?;
                Ok(AskOutcome::Failed)
            }
        }
    }

    /// Submit the handoff ticket.
    ///
    /// Both fields must be non-empty (validated before any network call) and
    /// the handoff must be awaiting a ticket; while a submission is in
    /// flight a second call is rejected. Success appends the thank-you
    /// message, clears the draft, and closes the handoff; failure appends
    /// the failure message and reopens the form with the draft intact.
    pub async fn submit_ticket(
        &self,
        email: &str,
        issue: &str,
    ) -> Result<TicketOutcome, ChatError> {
        let email = email.trim();
        let issue = issue.trim();
        if email.is_empty() {
            return Err(ChatError::EmptyField("email"));
        }
        if issue.is_empty() {
            return Err(ChatError::EmptyField("issue"));
        }

        match self.handoff.current() {
            HandoffState::AwaitingTicket => {}
            HandoffState::Submitting => return Err(ChatError::TicketInFlight),
            _ => return Err(ChatError::NotAwaitingTicket),
        }

        self.handoff.set_draft(email, issue);
        self.handoff.transition(HandoffState::Submitting)?;

        match self.backend.submit_ticket(email, issue).await {
            Ok(()) => {
                self.handoff.transition(HandoffState::Submitted)?;
                self.session.append(&Message::bot(TICKET_THANKS_REPLY))?;
                self.handoff.clear_draft();
                self.handoff.transition(HandoffState::Idle)?;
                tracing::info!("Support ticket submitted");
                Ok(TicketOutcome::Submitted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ticket submission failed");
                self.handoff.transition(HandoffState::Failed)?;
                self.session.append(&Message::bot(TICKET_FAILED_REPLY))?;
                self.handoff.transition(HandoffState::AwaitingTicket)?;
                Ok(TicketOutcome::Failed)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parley_core::types::{OrderRecord, Role};
    use parley_storage::Database;
    use tokio::sync::Semaphore;

    use crate::backend::MockSupportBackend;

    fn stores() -> (Arc<SessionStore>, Arc<PreferenceStore>) {
        let db = Arc::new(Database::in_memory().unwrap());
        (
            Arc::new(SessionStore::new(Arc::clone(&db))),
            Arc::new(PreferenceStore::new(db)),
        )
    }

    fn orchestrator(backend: MockSupportBackend) -> RequestOrchestrator<MockSupportBackend> {
        let (session, prefs) = stores();
        RequestOrchestrator::new(backend, session, prefs)
    }

    fn sample_order() -> OrderRecord {
        OrderRecord {
            id: "SH123".to_string(),
            status: "shipped".to_string(),
            customer_name: "A".to_string(),
            items: "x".to_string(),
            total_price: 9.99,
            shipping_address: "addr".to_string(),
            created_at: "2024-01-01".to_string(),
        }
    }

    // ---- Empty input ----

    #[tokio::test]
    async fn test_empty_ask_is_noop() {
        let orch = orchestrator(MockSupportBackend::new());
        let outcome = orch.ask("").await.unwrap();
        assert_eq!(outcome, AskOutcome::Ignored);
        assert!(orch.session().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_ask_is_noop() {
        let orch = orchestrator(MockSupportBackend::new());
        let outcome = orch.ask("   ").await.unwrap();
        assert_eq!(outcome, AskOutcome::Ignored);
        assert!(orch.session().is_empty());
        assert!(!orch.is_loading());
    }

    // ---- Plain answers ----

    #[tokio::test]
    async fn test_ask_appends_user_then_bot() {
        let orch = orchestrator(MockSupportBackend::new().with_answer("Hi there!"));
        let outcome = orch.ask("hello").await.unwrap();
        assert_eq!(outcome, AskOutcome::Answered);

        let session = orch.session().load();
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].text, "hello");
        assert_eq!(session.messages[1].role, Role::Bot);
        assert_eq!(session.messages[1].text, "Hi there!");
        assert!(!orch.is_loading());
    }

    #[tokio::test]
    async fn test_ask_trims_input_before_sending() {
        let backend = MockSupportBackend::new();
        let (session, prefs) = stores();
        let orch = RequestOrchestrator::new(backend, session, prefs);

        orch.ask("  hello  ").await.unwrap();
        assert_eq!(orch.backend.asks()[0].0, "hello");
        assert_eq!(orch.session().load().messages[0].text, "hello");
    }

    #[tokio::test]
    async fn test_ask_sends_preferred_language() {
        let backend = MockSupportBackend::new();
        let (session, prefs) = stores();
        prefs.set_language("fr").unwrap();
        let orch = RequestOrchestrator::new(backend, session, prefs);

        orch.ask("bonjour").await.unwrap();
        assert_eq!(
            orch.backend.asks(),
            vec![("bonjour".to_string(), "fr".to_string())]
        );
    }

    // ---- Order replies ----

    #[tokio::test]
    async fn test_order_reply_appends_summary() {
        let orch = orchestrator(MockSupportBackend::new().with_order(sample_order()));
        let outcome = orch.ask("track SH123").await.unwrap();
        assert_eq!(outcome, AskOutcome::Answered);

        let session = orch.session().load();
        assert_eq!(session.len(), 2);
        let summary = &session.messages[1].text;
        for field in ["SH123", "shipped", "A", "x", "9.99", "addr", "2024-01-01"] {
            assert!(summary.contains(field), "summary missing {}", field);
        }
    }

    #[tokio::test]
    async fn test_order_reply_is_never_classified() {
        // Even an order whose fields contain trigger wording must not
        // escalate: only plain answers are classified.
        let mut order = sample_order();
        order.shipping_address = "please provide your email".to_string();
        let orch = orchestrator(MockSupportBackend::new().with_order(order));

        let outcome = orch.ask("track SH123").await.unwrap();
        assert_eq!(outcome, AskOutcome::Answered);
        assert_eq!(orch.handoff().current(), HandoffState::Idle);
    }

    // ---- Escalation ----

    #[tokio::test]
    async fn test_escalation_reply_opens_handoff() {
        let orch = orchestrator(
            MockSupportBackend::new()
                .with_answer("We will connect you to a human agent shortly."),
        );
        let outcome = orch.ask("I need a human").await.unwrap();
        assert_eq!(outcome, AskOutcome::Escalated);
        assert_eq!(orch.handoff().current(), HandoffState::AwaitingTicket);

        // The reply is still appended verbatim.
        let session = orch.session().load();
        assert_eq!(
            session.messages[1].text,
            "We will connect you to a human agent shortly."
        );
    }

    #[tokio::test]
    async fn test_escalation_is_case_insensitive() {
        let orch = orchestrator(
            MockSupportBackend::new().with_answer("UNABLE TO ASSIST FURTHER."),
        );
        let outcome = orch.ask("help").await.unwrap();
        assert_eq!(outcome, AskOutcome::Escalated);
    }

    #[tokio::test]
    async fn test_repeated_escalation_keeps_handoff_open() {
        let orch = orchestrator(
            MockSupportBackend::new()
                .with_answer("Please provide your email.")
                .with_answer("Please provide your email."),
        );
        orch.ask("first").await.unwrap();
        orch.ask("second").await.unwrap();
        assert_eq!(orch.handoff().current(), HandoffState::AwaitingTicket);
    }

    // ---- Failure ----

    #[tokio::test]
    async fn test_failed_ask_appends_fallback() {
        let orch = orchestrator(MockSupportBackend::new().failing_asks());
        let outcome = orch.ask("hello").await.unwrap();
        assert_eq!(outcome, AskOutcome::Failed);

        let session = orch.session().load();
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages[1].text, FALLBACK_REPLY);
        assert!(!orch.is_loading());
    }

    #[tokio::test]
    async fn test_session_usable_after_failure() {
        let backend = MockSupportBackend::new().failing_asks();
        let (session, prefs) = stores();
        let orch = RequestOrchestrator::new(backend, session, prefs);

        orch.ask("first").await.unwrap();
        let outcome = orch.ask("second").await.unwrap();
        assert_eq!(outcome, AskOutcome::Failed);
        assert_eq!(orch.session().len(), 4);
    }

    // ---- Single flight ----

    #[tokio::test]
    async fn test_reentrant_ask_rejected() {
        let orch = orchestrator(MockSupportBackend::new());
        orch.loading.store(true, Ordering::SeqCst);

        let result = orch.ask("hello").await;
        assert!(matches!(result, Err(ChatError::Busy)));
        assert!(orch.session().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_ask_rejected_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = MockSupportBackend::new()
            .with_answer("done")
            .with_ask_gate(Arc::clone(&gate));
        let (session, prefs) = stores();
        let orch = Arc::new(RequestOrchestrator::new(backend, session, prefs));

        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.ask("first").await })
        };

        // Wait until the first request reaches the backend.
        while orch.backend.asks().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(orch.is_loading());

        let second = orch.ask("second").await;
        assert!(matches!(second, Err(ChatError::Busy)));

        gate.add_permits(1);
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, AskOutcome::Answered);

        // Only the first ask appended its pair; the rejected ask appended
        // nothing.
        let session = orch.session().load();
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages[0].text, "first");
        assert!(!orch.is_loading());
    }

    // ---- Voice path ----

    #[tokio::test]
    async fn test_ask_with_audio_tags_user_message() {
        let orch = orchestrator(MockSupportBackend::new().with_answer("Got it."));
        orch.ask_with_audio("voice question", Some("/clips/a.wav".to_string()))
            .await
            .unwrap();

        let session = orch.session().load();
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages[0].audio_url.as_deref(), Some("/clips/a.wav"));
        assert!(session.messages[1].audio_url.is_none());
    }

    // ---- Ticket submission ----

    fn escalated(backend: MockSupportBackend) -> RequestOrchestrator<MockSupportBackend> {
        let orch = orchestrator(backend);
        orch.handoff().trigger();
        orch
    }

    #[tokio::test]
    async fn test_ticket_empty_email_rejected_before_network() {
        let orch = escalated(MockSupportBackend::new());
        let result = orch.submit_ticket("", "broken widget").await;
        assert!(matches!(result, Err(ChatError::EmptyField("email"))));
        assert!(orch.backend.tickets().is_empty());
        assert_eq!(orch.handoff().current(), HandoffState::AwaitingTicket);
    }

    #[tokio::test]
    async fn test_ticket_empty_issue_rejected_before_network() {
        let orch = escalated(MockSupportBackend::new());
        let result = orch.submit_ticket("a@b.c", "   ").await;
        assert!(matches!(result, Err(ChatError::EmptyField("issue"))));
        assert!(orch.backend.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_ticket_rejected_when_not_awaiting() {
        let orch = orchestrator(MockSupportBackend::new());
        let result = orch.submit_ticket("a@b.c", "broken").await;
        assert!(matches!(result, Err(ChatError::NotAwaitingTicket)));
        assert!(orch.backend.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_successful_ticket_submission() {
        let orch = escalated(MockSupportBackend::new());
        let outcome = orch.submit_ticket("a@b.c", "broken widget").await.unwrap();
        assert_eq!(outcome, TicketOutcome::Submitted);

        assert_eq!(
            orch.backend.tickets(),
            vec![("a@b.c".to_string(), "broken widget".to_string())]
        );

        // Exactly one thank-you message, draft cleared, handoff closed.
        let session = orch.session().load();
        assert_eq!(session.len(), 1);
        assert_eq!(session.messages[0].text, TICKET_THANKS_REPLY);
        assert_eq!(orch.handoff().current(), HandoffState::Idle);
        assert!(orch.handoff().ticket().email.is_empty());
    }

    #[tokio::test]
    async fn test_failed_ticket_submission_reopens_form() {
        let orch = escalated(MockSupportBackend::new().failing_tickets());
        let outcome = orch.submit_ticket("a@b.c", "broken widget").await.unwrap();
        assert_eq!(outcome, TicketOutcome::Failed);

        let session = orch.session().load();
        assert_eq!(session.len(), 1);
        assert_eq!(session.messages[0].text, TICKET_FAILED_REPLY);

        // The form stays open with the draft intact for retry.
        assert_eq!(orch.handoff().current(), HandoffState::AwaitingTicket);
        let ticket = orch.handoff().ticket();
        assert_eq!(ticket.email, "a@b.c");
        assert_eq!(ticket.issue, "broken widget");
    }

    #[tokio::test]
    async fn test_failed_then_retried_ticket_succeeds() {
        let orch = escalated(MockSupportBackend::new());
        orch.backend.set_failing_tickets(true);
        let outcome = orch.submit_ticket("a@b.c", "broken").await.unwrap();
        assert_eq!(outcome, TicketOutcome::Failed);

        orch.backend.set_failing_tickets(false);
        let outcome = orch.submit_ticket("a@b.c", "broken").await.unwrap();
        assert_eq!(outcome, TicketOutcome::Submitted);
        assert_eq!(orch.handoff().current(), HandoffState::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_ticket_submission_rejected() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = MockSupportBackend::new().with_ticket_gate(Arc::clone(&gate));
        let (session, prefs) = stores();
        let orch = Arc::new(RequestOrchestrator::new(backend, session, prefs));
        orch.handoff().trigger();

        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.submit_ticket("a@b.c", "broken").await })
        };

        while orch.backend.tickets().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(orch.handoff().current(), HandoffState::Submitting);

        let second = orch.submit_ticket("d@e.f", "other").await;
        assert!(matches!(second, Err(ChatError::TicketInFlight)));

        gate.add_permits(1);
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, TicketOutcome::Submitted);
        assert_eq!(orch.backend.tickets().len(), 1);
    }

    // ---- Full escalation flow ----

    #[tokio::test]
    async fn test_escalate_then_submit_flow() {
        let backend = MockSupportBackend::new().with_answer(
            "I'm unable to assist further. Please provide your email and issue \
             so we can connect you to a human agent.",
        );
        let (session, prefs) = stores();
        let orch = RequestOrchestrator::new(backend, session, prefs);

        let outcome = orch.ask("I want to speak to a human").await.unwrap();
        assert_eq!(outcome, AskOutcome::Escalated);
        assert_eq!(orch.handoff().current(), HandoffState::AwaitingTicket);

        let outcome = orch.submit_ticket("a@b.c", "unresolved issue").await.unwrap();
        assert_eq!(outcome, TicketOutcome::Submitted);

        // user question, escalation reply, thank-you.
        let session = orch.session().load();
        assert_eq!(session.len(), 3);
        assert_eq!(session.messages[2].text, TICKET_THANKS_REPLY);
    }
}
