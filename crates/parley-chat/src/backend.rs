//! Support backend client.
//!
//! The backend exposes two endpoints: `GET /ask` returning either a plain
//! answer or a structured order payload, and `POST /support_ticket` for the
//! handoff workflow. The trait seam lets tests substitute a scripted mock
//! for the reqwest implementation.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use parley_core::error::ParleyError;
use parley_core::types::OrderRecord;

// =============================================================================
// Wire types
// =============================================================================

/// Reply payload from the ask endpoint.
///
/// Decoded as a tagged union: the order shape is tried first, then the plain
/// answer; any other shape is a malformed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AskReply {
    Order { order: OrderRecord },
    Answer { answer: String },
}

#[derive(Debug, Serialize)]
struct TicketBody<'a> {
    email: &'a str,
    issue: &'a str,
}

// =============================================================================
// Trait
// =============================================================================

/// Outbound interface to the support backend.
pub trait SupportBackend: Send + Sync {
    /// Send a question and the preferred reply language.
    fn ask(
        &self,
        question: &str,
        target_lang: &str,
    ) -> impl Future<Output = Result<AskReply, ParleyError>> + Send;

    /// Submit a handoff ticket. Any 2xx status is success.
    fn submit_ticket(
        &self,
        email: &str,
        issue: &str,
    ) -> impl Future<Output = Result<(), ParleyError>> + Send;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// reqwest-backed client for the support backend.
pub struct HttpSupportBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSupportBackend {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl SupportBackend for HttpSupportBackend {
    async fn ask(&self, question: &str, target_lang: &str) -> Result<AskReply, ParleyError> {
        let response = self
            .client
            .get(format!("{}/ask", self.base_url))
            .query(&[("question", question), ("target_lang", target_lang)])
            .send()
            .await
            .map_err(|e| ParleyError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| ParleyError::Network(e.to_string()))?;

        response
            .json::<AskReply>()
            .await
            .map_err(|e| ParleyError::MalformedResponse(e.to_string()))
    }

    async fn submit_ticket(&self, email: &str, issue: &str) -> Result<(), ParleyError> {
        self.client
            .post(format!("{}/support_ticket", self.base_url))
            .json(&TicketBody { email, issue })
            .send()
            .await
            .map_err(|e| ParleyError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| ParleyError::Network(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Scripted backend for testing.
///
/// Replies are served from a queue (falling back to a generic answer), both
/// endpoints can be failed on demand, calls are recorded, and optional
/// semaphore gates hold a request in flight until the test releases it.
#[derive(Default)]
pub struct MockSupportBackend {
    replies: Mutex<VecDeque<AskReply>>,
    fail_asks: AtomicBool,
    fail_tickets: AtomicBool,
    ask_gate: Option<Arc<Semaphore>>,
    ticket_gate: Option<Arc<Semaphore>>,
    asks: Mutex<Vec<(String, String)>>,
    tickets: Mutex<Vec<(String, String)>>,
}

impl MockSupportBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain answer reply.
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("replies mutex poisoned")
            .push_back(AskReply::Answer {
                answer: answer.into(),
            });
        self
    }

    /// Queue a structured order reply.
    pub fn with_order(self, order: OrderRecord) -> Self {
        self.replies
            .lock()
            .expect("replies mutex poisoned")
            .push_back(AskReply::Order { order });
        self
    }

    /// Fail every ask with a network error.
    pub fn failing_asks(self) -> Self {
        self.fail_asks.store(true, Ordering::SeqCst);
        self
    }

    /// Fail every ticket submission with a network error.
    pub fn failing_tickets(self) -> Self {
        self.fail_tickets.store(true, Ordering::SeqCst);
        self
    }

    /// Toggle ticket failures on an existing backend.
    pub fn set_failing_tickets(&self, fail: bool) {
        self.fail_tickets.store(fail, Ordering::SeqCst);
    }

    /// Hold each ask until a permit is added to the semaphore.
    pub fn with_ask_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.ask_gate = Some(gate);
        self
    }

    /// Hold each ticket submission until a permit is added to the semaphore.
    pub fn with_ticket_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.ticket_gate = Some(gate);
        self
    }

    /// Recorded `(question, target_lang)` pairs.
    pub fn asks(&self) -> Vec<(String, String)> {
        self.asks.lock().expect("asks mutex poisoned").clone()
    }

    /// Recorded `(email, issue)` pairs.
    pub fn tickets(&self) -> Vec<(String, String)> {
        self.tickets.lock().expect("tickets mutex poisoned").clone()
    }
}

impl SupportBackend for MockSupportBackend {
    async fn ask(&self, question: &str, target_lang: &str) -> Result<AskReply, ParleyError> {
        self.asks
            .lock()
            .expect("asks mutex poisoned")
            .push((question.to_string(), target_lang.to_string()));

        if let Some(ref gate) = self.ask_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ParleyError::Network(e.to_string()))?;
            permit.forget();
        }

        if self.fail_asks.load(Ordering::SeqCst) {
            return Err(ParleyError::Network("connection refused".to_string()));
        }

        Ok(self
            .replies
            .lock()
            .expect("replies mutex poisoned")
            .pop_front()
            .unwrap_or(AskReply::Answer {
                answer: "Happy to help!".to_string(),
            }))
    }

    async fn submit_ticket(&self, email: &str, issue: &str) -> Result<(), ParleyError> {
        self.tickets
            .lock()
            .expect("tickets mutex poisoned")
            .push((email.to_string(), issue.to_string()));

        if let Some(ref gate) = self.ticket_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ParleyError::Network(e.to_string()))?;
            permit.forget();
        }

        if self.fail_tickets.load(Ordering::SeqCst) {
            return Err(ParleyError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
