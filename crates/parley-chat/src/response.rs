//! Response classification and formatting.
//!
//! Plain answers are scanned for the backend's escalation wording; order
//! payloads are rendered into a fixed-order multi-line summary.

use parley_core::types::OrderRecord;

/// Phrases in a bot answer that trigger the human handoff flow.
///
/// Matched case-insensitively as substrings. Must stay in sync with the
/// backend's canned escalation wording.
pub const ESCALATION_TRIGGERS: &[&str] = &[
    "connect you to a human agent",
    "please provide your email",
    "unable to assist further",
];

/// Whether a plain answer asks to escalate to a human agent.
///
/// Only plain answers are classified; order summaries never are.
pub fn is_escalation(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    ESCALATION_TRIGGERS
        .iter()
        .any(|trigger| lowered.contains(trigger))
}

/// Render an order record as a multi-line summary.
///
/// Field order is fixed: id, status, customer name, items, total price,
/// shipping address, creation date.
pub fn format_order_summary(order: &OrderRecord) -> String {
    format!(
        "Order {}\nStatus: {}\nCustomer: {}\nItems: {}\nTotal: ${:.2}\nShipping address: {}\nCreated: {}",
        order.id,
        order.status,
        order.customer_name,
        order.items,
        order.total_price,
        order.shipping_address,
        order.created_at,
    )
}

// =============================================================================
// Tests
// =============================================================================
