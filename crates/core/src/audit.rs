//! Audit trail for conversation transitions and order lifecycle changes.
//!
//! Events are typed by [`AuditKind`]; each kind carries the fields a reviewer needs to
//! reconstruct what the buyer saw, so sinks never parse free-form metadata.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::flows::states::{ConversationEvent, ConversationState};

/// Order figures captured at the moment of a lifecycle change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub line_count: usize,
    pub unmatched_count: usize,
    pub total: Decimal,
    pub currency: String,
}

impl From<&Order> for OrderSnapshot {
    fn from(order: &Order) -> Self {
        Self {
            status: order.status,
            line_count: order.lines.len(),
            unmatched_count: order.unmatched_count(),
            total: order.totals.total,
            currency: order.totals.currency.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditKind {
    TransitionApplied { from: ConversationState, to: ConversationState, event: ConversationEvent },
    TransitionRejected { state: ConversationState, event: ConversationEvent },
    OrderConfirmed(OrderSnapshot),
    OrderCancelled(OrderSnapshot),
}

impl AuditKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TransitionApplied { .. } => "conversation.transition_applied",
            Self::TransitionRejected { .. } => "conversation.transition_rejected",
            Self::OrderConfirmed(_) => "order.confirmed",
            Self::OrderCancelled(_) => "order.cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub session_key: String,
    pub order_id: Option<OrderId>,
    #[serde(flatten)]
    pub kind: AuditKind,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(session_key: impl Into<String>, order_id: Option<OrderId>, kind: AuditKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            session_key: session_key.into(),
            order_id,
            kind,
            occurred_at: Utc::now(),
        }
    }

    /// A lifecycle event for `order`, keyed by its id.
    pub fn for_order(session_key: impl Into<String>, order: &Order, kind: AuditKind) -> Self {
        Self::new(session_key, Some(order.order_id.clone()), kind)
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Keeps every event in memory; used by tests and the local chat loop.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(event);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{AuditEvent, AuditKind, AuditSink, InMemoryAuditSink, OrderSnapshot};
    use crate::domain::order::{Order, OrderId, OrderStatus, OrderTotals};
    use crate::flows::states::{ConversationEvent, ConversationState};

    fn confirmed_order() -> Order {
        Order {
            order_id: OrderId("UB-20260131-ABC123".to_string()),
            lines: Vec::new(),
            totals: OrderTotals {
                subtotal: Decimal::new(199_000, 2),
                discount: Decimal::ZERO,
                tax: Decimal::new(17_910, 2),
                shipping: Decimal::ZERO,
                total: Decimal::new(216_910, 2),
                currency: "SGD".to_string(),
            },
            delivery: None,
            customer_name: None,
            customer_contact: None,
            source_text: String::new(),
            confidence: 0.9,
            needs_confirmation: false,
            confirmation_notes: Vec::new(),
            created_at: Utc::now(),
            status: OrderStatus::Confirmed,
        }
    }

    #[test]
    fn order_events_snapshot_the_order() {
        let sink = InMemoryAuditSink::default();
        let order = confirmed_order();
        sink.emit(AuditEvent::for_order("6591234567", &order, AuditKind::OrderConfirmed((&order).into())));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "order.confirmed");
        assert_eq!(events[0].session_key, "6591234567");
        assert_eq!(events[0].order_id.as_ref().map(OrderId::as_str), Some("UB-20260131-ABC123"));
        let AuditKind::OrderConfirmed(snapshot) = &events[0].kind else {
            panic!("expected a confirmation event, got {:?}", events[0].kind);
        };
        assert_eq!(snapshot.total, Decimal::new(216_910, 2));
        assert_eq!(snapshot.status, OrderStatus::Confirmed);
    }

    #[test]
    fn events_serialize_flat_with_a_kind_tag() {
        let event = AuditEvent::new(
            "buyer",
            None,
            AuditKind::TransitionApplied {
                from: ConversationState::AwaitingConfirmation,
                to: ConversationState::Idle,
                event: ConversationEvent::CancelRequested,
            },
        );
        let value = serde_json::to_value(&event).expect("audit events serialize");

        assert_eq!(value["kind"], json!("transition_applied"));
        assert_eq!(value["to"], json!("idle"));
        assert_eq!(value["session_key"], json!("buyer"));
        assert!(value["order_id"].is_null());
    }

    #[test]
    fn snapshot_counts_unmatched_lines() {
        let snapshot = OrderSnapshot::from(&confirmed_order());
        assert_eq!(snapshot.line_count, 0);
        assert_eq!(snapshot.unmatched_count, 0);
        assert_eq!(snapshot.currency, "SGD");
    }
}
