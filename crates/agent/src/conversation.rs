//! Per-buyer order dialogue.
//!
//! Each inbound message is handled under its session's lock: the current state decides
//! how the text is read, the pipeline work for that reading runs, and the resulting
//! [`ConversationEvent`] is applied through the core transition table. Every path ends in
//! an [`OutboundAction`]; nothing here returns an error to the transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use ordercopilot_core::audit::{AuditEvent, AuditKind, AuditSink, OrderSnapshot};
use ordercopilot_core::catalog::matcher::{DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE};
use ordercopilot_core::catalog::{CatalogIndex, MatchCandidate, ProductMatcher};
use ordercopilot_core::config::AppConfig;
use ordercopilot_core::domain::intent::{IntentKind, ParsedIntent};
use ordercopilot_core::domain::order::{DeliveryDetails, Order};
use ordercopilot_core::domain::product::ProductId;
use ordercopilot_core::flows::{
    transition, transition_with_audit, ConversationEvent, ConversationState, FlowTransitionError,
    TransitionOutcome,
};
use ordercopilot_core::ordering::OrderAssembler;

use crate::actions::{Button, ListRow, OutboundAction, SELECTION_PREFIX};
use crate::intent::IntentExtractor;
use crate::llm::completion_service_from_config;
use crate::session::{InMemorySessionStore, PendingSelection, Session, SessionStore};

/// Candidates considered per mention when assembling an inquiry.
const INQUIRY_MAX_RESULTS: usize = 3;

const CONFIRM_TOKENS: &[&str] = &["confirm_order", "yes", "confirm", "proceed"];
const MODIFY_TOKENS: &[&str] = &["modify_order", "modify", "change"];
const CANCEL_TOKENS: &[&str] = &["cancel_order", "cancel", "no"];
const ADD_MORE_TOKEN: &str = "add_more";
const CHECKOUT_TOKEN: &str = "checkout";

pub const ONBOARDING_TEXT: &str = "Hi! I'm your Order Copilot. I can help you with:\n\n\
• Placing orders for hardware supplies\n\
• Checking product prices and availability\n\
• Tracking your order status\n\n\
Just tell me what you need! For example:\n\
_'I need 10 Acorn ceiling fans for a condo project'_";

pub const ORDER_NUMBER_PROMPT: &str =
    "To check your order status, please provide your order number.\n\nExample: _UB-20260131-ABC123_";

const QUANTITY_REPROMPT: &str = "Please enter a valid quantity (a positive number).\n\nExample: _10_";

const DELIVERY_REQUEST: &str = "Great! Please provide your delivery details:\n\n\
📍 Delivery address\n\
📅 Preferred delivery date\n\
📱 Contact number\n\n\
Example: _123 Hougang Ave 1, #01-01, Singapore 530123. Delivery next Monday. Contact: 91234567_";

const CHECKOUT_REQUEST: &str = "Please provide your delivery details:\n\n\
📍 Delivery address\n\
📅 Preferred delivery date\n\
📱 Contact number";

const MODIFY_PROMPT: &str = "No problem! What would you like to change?\n\n\
You can:\n\
• Add more products\n\
• Change quantities\n\
• Remove items\n\n\
Just tell me what you need!";

const ADD_MORE_PROMPT: &str =
    "Sure! What else would you like to add?\n\nTell me the product name or search for items.";

const CANCELLED_TEXT: &str =
    "Order cancelled. No worries!\n\nFeel free to start a new order anytime. Just tell me what you need! 😊";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchingSettings {
    pub max_results: usize,
    pub min_score: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self { max_results: DEFAULT_MAX_RESULTS, min_score: DEFAULT_MIN_SCORE }
    }
}

/// What one message resolved to, before the transition is applied.
struct Turn {
    event: ConversationEvent,
    reply: OutboundAction,
}

impl Turn {
    fn new(event: ConversationEvent, reply: OutboundAction) -> Self {
        Self { event, reply }
    }
}

pub struct ConversationEngine {
    extractor: IntentExtractor,
    matcher: Arc<ProductMatcher>,
    assembler: OrderAssembler,
    sessions: Arc<dyn SessionStore>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    matching: MatchingSettings,
}

impl ConversationEngine {
    pub fn new(
        extractor: IntentExtractor,
        matcher: Arc<ProductMatcher>,
        assembler: OrderAssembler,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self { extractor, matcher, assembler, sessions, audit_sink: None, matching: MatchingSettings::default() }
    }

    /// Wires the completion service, pricing, matching and id settings from `config`
    /// around an in-memory session store.
    pub fn from_config(config: &AppConfig, catalog: Arc<CatalogIndex>) -> anyhow::Result<Self> {
        let service = completion_service_from_config(&config.llm)?;
        let engine = Self::new(
            IntentExtractor::new(service),
            Arc::new(ProductMatcher::new(catalog)),
            OrderAssembler::new(config.pricing_policy(), config.ordering.order_id_prefix.clone()),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_matching(MatchingSettings {
            max_results: config.matching.max_results,
            min_score: config.matching.min_score,
        });
        Ok(engine)
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_matching(mut self, matching: MatchingSettings) -> Self {
        self.matching = matching;
        self
    }

    pub fn matcher(&self) -> &Arc<ProductMatcher> {
        &self.matcher
    }

    /// Handles one inbound message for `session_key`. Messages for the same key are
    /// processed one at a time in arrival order; other keys proceed concurrently.
    pub async fn handle_message(&self, session_key: &str, text: &str) -> OutboundAction {
        let handle = self.sessions.acquire(session_key).await;
        let mut session = handle.lock_owned().await;
        session.touch(Utc::now());

        let current = session.state;
        let turn = if current.accepts_inquiry() {
            self.handle_inquiry(&mut session, text).await
        } else {
            match current {
                ConversationState::AwaitingProductSelection => self.handle_selection(&mut session, text),
                ConversationState::AwaitingQuantity => self.handle_quantity(&mut session, text),
                ConversationState::AwaitingConfirmation => self.handle_confirmation(&mut session, text),
                ConversationState::AwaitingDeliveryInfo => self.handle_delivery(&mut session, text),
                _ => self.handle_inquiry(&mut session, text).await,
            }
        };

        match self.apply(&mut session, turn.event) {
            Ok(_) => turn.reply,
            Err(error) => {
                warn!(
                    event_name = "conversation.transition_rejected",
                    session_key,
                    error = %error,
                    "resolved event does not apply; restarting inquiry"
                );
                session.clear_draft();
                session.state = ConversationState::AwaitingInquiry;
                OutboundAction::text(ONBOARDING_TEXT)
            }
        }
    }

    /// Closes a confirmed conversation once fulfilment has taken the order.
    pub async fn complete(&self, session_key: &str) -> Result<TransitionOutcome, FlowTransitionError> {
        let Some(handle) = self.sessions.get(session_key).await else {
            return transition(ConversationState::Idle, ConversationEvent::OrderFulfilled);
        };
        let mut session = handle.lock_owned().await;
        session.touch(Utc::now());
        self.apply(&mut session, ConversationEvent::OrderFulfilled)
    }

    pub async fn reset(&self, session_key: &str) -> bool {
        let removed = self.sessions.reset(session_key).await;
        if removed {
            info!(event_name = "conversation.reset", session_key, "session reset");
        }
        removed
    }

    pub async fn session_state(&self, session_key: &str) -> Option<ConversationState> {
        let handle = self.sessions.get(session_key).await?;
        let session = handle.lock().await;
        Some(session.state)
    }

    pub async fn draft_order(&self, session_key: &str) -> Option<Order> {
        let handle = self.sessions.get(session_key).await?;
        let session = handle.lock().await;
        session.draft_order.clone()
    }

    pub async fn evict_idle(&self, idle_for: Duration) -> usize {
        self.sessions.evict_idle(idle_for).await
    }

    fn apply(
        &self,
        session: &mut Session,
        event: ConversationEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let outcome = match &self.audit_sink {
            Some(sink) => transition_with_audit(
                session.state,
                event,
                sink.as_ref(),
                &session.session_key,
                session.draft_order.as_ref().map(|order| &order.order_id),
            ),
            None => transition(session.state, event),
        }?;

        info!(
            event_name = "conversation.transition",
            session_key = %session.session_key,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            event = ?outcome.event,
            "conversation transition applied"
        );
        session.state = outcome.to;
        Ok(outcome)
    }

    async fn handle_inquiry(&self, session: &mut Session, text: &str) -> Turn {
        let intent = self.extractor.extract(text).await;

        match intent.intent_kind {
            IntentKind::Unclear => {
                session.parsed_intent = Some(intent);
                Turn::new(ConversationEvent::InquiryUnclear, OutboundAction::text(ONBOARDING_TEXT))
            }
            IntentKind::OrderStatus => {
                Turn::new(ConversationEvent::StatusRequested, OutboundAction::text(ORDER_NUMBER_PROMPT))
            }
            _ => {
                let candidates = best_candidates(&self.matcher, &intent, self.matching.min_score);
                let order = self.assembler.extract(&intent, &candidates, text);
                let reply = self.order_summary_prompt(&order);

                session.parsed_intent = Some(intent);
                session.matched_candidates = candidates.into_iter().flatten().collect();
                session.pending_selection = None;
                session.draft_order = Some(order);
                Turn::new(ConversationEvent::InquiryAssembled, reply)
            }
        }
    }

    fn order_summary_prompt(&self, order: &Order) -> OutboundAction {
        let summary = self.assembler.render_summary(order);
        let footer = if order.needs_confirmation && !order.confirmation_notes.is_empty() {
            order.confirmation_notes.iter().map(|note| format!("⚠️ {note}")).collect::<Vec<_>>().join("\n")
        } else {
            "Would you like to proceed with this order?".to_string()
        };

        OutboundAction::interactive(
            format!("📋 *Order Summary*\n\n{summary}\n\n{footer}"),
            confirmation_buttons("Modify Order"),
        )
    }

    fn handle_selection(&self, session: &mut Session, text: &str) -> Turn {
        let trimmed = text.trim();
        let selected = trimmed
            .strip_prefix(SELECTION_PREFIX)
            .and_then(|product_id| self.matcher.get_by_id(&ProductId(product_id.to_string())));

        if let Some(candidate) = selected {
            let reply = OutboundAction::text(format!(
                "Great choice! *{}* - ${:.2}\n\nHow many units do you need?",
                candidate.display_name, candidate.price
            ));
            session.pending_selection = Some(PendingSelection { candidate, quantity: None });
            return Turn::new(ConversationEvent::ProductSelected, reply);
        }

        let result = self.matcher.match_products(
            trimmed,
            None,
            None,
            self.matching.max_results,
            self.matching.min_score,
        );
        let reply = if result.matches.is_empty() {
            OutboundAction::text(format!(
                "Sorry, I couldn't find any products matching '{trimmed}'. \
                 Please try a different search term or browse our catalog."
            ))
        } else {
            OutboundAction::product_list(
                format!("Found {} products matching '{trimmed}':", result.total_found),
                result.matches.iter().map(ListRow::for_candidate).collect(),
            )
        };
        session.matched_candidates = result.matches;
        Turn::new(ConversationEvent::SearchRequested, reply)
    }

    fn handle_quantity(&self, session: &mut Session, text: &str) -> Turn {
        let quantity = match text.trim().parse::<u32>() {
            Ok(quantity) if quantity > 0 => quantity,
            _ => {
                return Turn::new(ConversationEvent::QuantityRejected, OutboundAction::text(QUANTITY_REPROMPT));
            }
        };

        if let Some(mut pending) = session.pending_selection.take() {
            pending.quantity = Some(quantity);
            let line = OrderAssembler::line_from_candidate(&pending.candidate, quantity, None);
            let intent =
                session.parsed_intent.as_ref().filter(|intent| intent.intent_kind != IntentKind::Unclear);
            let order = session.draft_order.get_or_insert_with(|| self.assembler.empty_draft(text));
            self.assembler.append_line(order, line, intent);
        }

        Turn::new(
            ConversationEvent::QuantityAccepted,
            OutboundAction::interactive(
                format!(
                    "Added {quantity} units to your order.\n\n\
                     Would you like to add more items or proceed to checkout?"
                ),
                vec![
                    Button::new(ADD_MORE_TOKEN, "Add More Items"),
                    Button::new(CHECKOUT_TOKEN, "Checkout"),
                    Button::new("cancel_order", "Cancel"),
                ],
            ),
        )
    }

    fn handle_confirmation(&self, session: &mut Session, text: &str) -> Turn {
        let token = text.trim().to_lowercase();
        let token = token.as_str();

        if CONFIRM_TOKENS.contains(&token) {
            return self.confirm_draft(session);
        }
        if MODIFY_TOKENS.contains(&token) {
            return Turn::new(ConversationEvent::ModifyRequested, OutboundAction::text(MODIFY_PROMPT));
        }
        if CANCEL_TOKENS.contains(&token) {
            if let Some(order) = session.draft_order.as_mut() {
                if order.cancel().is_ok() {
                    self.emit_order_event(&session.session_key, order, AuditKind::OrderCancelled);
                }
            }
            session.clear_draft();
            return Turn::new(ConversationEvent::CancelRequested, OutboundAction::text(CANCELLED_TEXT));
        }
        if token == ADD_MORE_TOKEN {
            return Turn::new(ConversationEvent::AddMoreRequested, OutboundAction::text(ADD_MORE_PROMPT));
        }
        if token == CHECKOUT_TOKEN {
            return Turn::new(ConversationEvent::CheckoutRequested, OutboundAction::text(CHECKOUT_REQUEST));
        }

        Turn::new(
            ConversationEvent::Unrecognized,
            OutboundAction::interactive("Please select an option:", confirmation_buttons("Modify Order")),
        )
    }

    fn confirm_draft(&self, session: &mut Session) -> Turn {
        let Some(order) = session.draft_order.as_mut() else {
            return Turn::new(ConversationEvent::DraftMissing, OutboundAction::text(ONBOARDING_TEXT));
        };

        if !order.has_delivery() {
            return Turn::new(
                ConversationEvent::ConfirmRequested { has_delivery: false },
                OutboundAction::text(DELIVERY_REQUEST),
            );
        }

        if let Err(error) = self.assembler.confirm_order(order) {
            warn!(
                event_name = "order.confirm_rejected",
                session_key = %session.session_key,
                error = %error,
                "draft order could not be confirmed"
            );
            session.clear_draft();
            return Turn::new(ConversationEvent::DraftMissing, OutboundAction::text(ONBOARDING_TEXT));
        }

        let order = order.clone();
        self.emit_order_event(&session.session_key, &order, AuditKind::OrderConfirmed);
        info!(
            event_name = "order.confirmed",
            session_key = %session.session_key,
            order_id = %order.order_id,
            total = %order.totals.total,
            "order confirmed"
        );

        let body = format!(
            "✅ *Order Confirmed!*\n\n\
             Order ID: *{}*\n\n\
             We'll process your order and send you a Delivery Order (DO) shortly.\n\n\
             Thank you for ordering with us! 🙏",
            order.order_id
        );
        Turn::new(
            ConversationEvent::ConfirmRequested { has_delivery: true },
            OutboundAction::order_confirmed(order, body),
        )
    }

    fn handle_delivery(&self, session: &mut Session, text: &str) -> Turn {
        let delivery_text = text.trim();
        let summary = match session.draft_order.as_mut() {
            Some(order) => {
                let urgency = order.delivery.as_ref().map(|delivery| delivery.urgency);
                let mut delivery = DeliveryDetails::from_free_text(delivery_text);
                if let Some(urgency) = urgency {
                    delivery.urgency = urgency;
                }
                order.delivery = Some(delivery);
                self.assembler.render_summary(order)
            }
            None => String::new(),
        };

        Turn::new(
            ConversationEvent::DeliveryCaptured,
            OutboundAction::interactive(
                format!("📋 *Final Order Summary*\n\n{summary}\n\n📍 Delivery: {delivery_text}\n\nReady to confirm?"),
                confirmation_buttons("Modify"),
            ),
        )
    }

    fn emit_order_event(&self, session_key: &str, order: &Order, kind: fn(OrderSnapshot) -> AuditKind) {
        if let Some(sink) = &self.audit_sink {
            sink.emit(AuditEvent::for_order(session_key, order, kind(order.into())));
        }
    }
}

/// Best candidate per mention, in mention order, with `None` for mentions that matched
/// nothing. This is the aligned list [`OrderAssembler::extract`] expects.
pub fn best_candidates(
    matcher: &ProductMatcher,
    intent: &ParsedIntent,
    min_score: f64,
) -> Vec<Option<MatchCandidate>> {
    intent
        .mentions
        .iter()
        .map(|mention| {
            matcher
                .match_products(
                    mention.search_text(),
                    mention.brand.as_deref(),
                    mention.category.as_deref(),
                    INQUIRY_MAX_RESULTS,
                    min_score,
                )
                .best_match
        })
        .collect()
}

fn confirmation_buttons(modify_label: &str) -> Vec<Button> {
    vec![
        Button::new("confirm_order", "Confirm Order"),
        Button::new("modify_order", modify_label),
        Button::new("cancel_order", "Cancel"),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use ordercopilot_core::audit::InMemoryAuditSink;
    use ordercopilot_core::catalog::{CatalogIndex, ProductMatcher};
    use ordercopilot_core::domain::order::OrderStatus;
    use ordercopilot_core::domain::product::{CatalogRecord, ProductId};
    use ordercopilot_core::flows::ConversationState;
    use ordercopilot_core::ordering::OrderAssembler;

    use super::{ConversationEngine, ONBOARDING_TEXT, ORDER_NUMBER_PROMPT};
    use crate::actions::{selection_token, OutboundAction};
    use crate::intent::IntentExtractor;
    use crate::session::InMemorySessionStore;

    fn record(id: &str, name: &str, price: i64) -> CatalogRecord {
        CatalogRecord {
            id: ProductId(id.to_string()),
            display_name: name.to_string(),
            normalized_name: name.to_string(),
            price: Decimal::new(price, 2),
            original_price: None,
            brand: None,
            category: None,
            url: String::new(),
            image_ref: None,
        }
    }

    fn engine() -> ConversationEngine {
        let catalog = CatalogIndex::new(vec![
            record("AC-DC-52", "Acorn DC Ceiling Fan", 19_900),
            record("TC-HOOD-90", "Tecno Chimney Hood 90cm", 45_900),
            record("MK-DRILL", "Makita Cordless Drill", 12_900),
        ]);
        ConversationEngine::new(
            IntentExtractor::default(),
            Arc::new(ProductMatcher::new(Arc::new(catalog))),
            OrderAssembler::default(),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    #[tokio::test]
    async fn unclear_message_prompts_onboarding() {
        let engine = engine();
        let reply = engine.handle_message("buyer", "   ").await;

        assert_eq!(reply, OutboundAction::text(ONBOARDING_TEXT));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingInquiry));
    }

    #[tokio::test]
    async fn status_request_keeps_state() {
        let engine = engine();
        let reply = engine.handle_message("buyer", "where is my order").await;

        assert_eq!(reply, OutboundAction::text(ORDER_NUMBER_PROMPT));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::Idle));
    }

    #[tokio::test]
    async fn confirm_without_delivery_asks_for_it_then_confirms() {
        let engine = engine();
        let reply = engine.handle_message("buyer", "2 tecno hoods please").await;
        assert_eq!(reply.kind(), "send_interactive");
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingConfirmation));

        let reply = engine.handle_message("buyer", "yes").await;
        assert!(reply.body().contains("delivery details"));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingDeliveryInfo));

        let reply = engine.handle_message("buyer", "  10 Kovan Rd, call 91234567 ").await;
        assert!(reply.body().contains("📍 Delivery: 10 Kovan Rd, call 91234567"));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingConfirmation));

        let reply = engine.handle_message("buyer", "Confirm").await;
        let OutboundAction::OrderConfirmed { order_id, order, .. } = reply else {
            panic!("expected an order confirmation, got {reply:?}");
        };
        assert_eq!(order.order_id, order_id);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.delivery.map(|delivery| delivery.address), Some("10 Kovan Rd, call 91234567".to_string()));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::OrderConfirmed));
    }

    #[tokio::test]
    async fn selection_quantity_and_checkout_build_a_draft() {
        let engine = engine();
        engine.handle_message("buyer", "2 tecno hoods please").await;
        engine.handle_message("buyer", "add_more").await;
        assert_eq!(
            engine.session_state("buyer").await,
            Some(ConversationState::AwaitingProductSelection)
        );

        let reply = engine.handle_message("buyer", "makita drill").await;
        assert_eq!(reply.kind(), "send_product_list");
        assert_eq!(
            engine.session_state("buyer").await,
            Some(ConversationState::AwaitingProductSelection)
        );

        let reply = engine.handle_message("buyer", &selection_token("MK-DRILL")).await;
        assert!(reply.body().starts_with("Great choice! *Makita Cordless Drill* - $129.00"));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingQuantity));

        for rejected in ["zero", "0", "-4", "2.5"] {
            let reply = engine.handle_message("buyer", rejected).await;
            assert!(reply.body().starts_with("Please enter a valid quantity"));
            assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingQuantity));
        }

        let reply = engine.handle_message("buyer", " 3 ").await;
        assert!(reply.body().starts_with("Added 3 units"));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingConfirmation));

        let draft = engine.draft_order("buyer").await.expect("draft exists");
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[1].quantity, 3);
        assert_eq!(draft.lines[1].line_total, Decimal::new(38_700, 2));

        engine.handle_message("buyer", "checkout").await;
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingDeliveryInfo));
    }

    #[tokio::test]
    async fn unknown_search_reports_not_found() {
        let engine = engine();
        engine.handle_message("buyer", "2 tecno hoods please").await;
        engine.handle_message("buyer", "modify").await;

        let reply = engine.handle_message("buyer", "zzzz qqqq").await;
        assert!(reply.body().starts_with("Sorry, I couldn't find any products matching 'zzzz qqqq'"));
        assert_eq!(
            engine.session_state("buyer").await,
            Some(ConversationState::AwaitingProductSelection)
        );
    }

    #[tokio::test]
    async fn cancel_clears_draft_and_returns_to_idle() {
        let sink = Arc::new(InMemoryAuditSink::default());
        let engine = engine().with_audit_sink(sink.clone());
        engine.handle_message("buyer", "2 tecno hoods please").await;

        let reply = engine.handle_message("buyer", "no").await;
        assert!(reply.body().starts_with("Order cancelled."));
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::Idle));
        assert!(engine.draft_order("buyer").await.is_none());

        let events = sink.events();
        assert!(events.iter().any(|event| event.event_type() == "order.cancelled"));
        assert!(events.iter().all(|event| event.session_key == "buyer"));
    }

    #[tokio::test]
    async fn unrecognized_choice_reprompts() {
        let engine = engine();
        engine.handle_message("buyer", "2 tecno hoods please").await;

        let reply = engine.handle_message("buyer", "maybe later").await;
        assert_eq!(reply.body(), "Please select an option:");
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingConfirmation));
    }

    #[tokio::test]
    async fn complete_requires_a_confirmed_order() {
        let engine = engine();
        assert!(engine.complete("nobody").await.is_err());

        engine.handle_message("buyer", "2 tecno hoods to bedok").await;
        assert!(engine.complete("buyer").await.is_err());

        engine.handle_message("buyer", "proceed").await;
        let outcome = engine.complete("buyer").await.expect("confirmed order completes");
        assert_eq!(outcome.to, ConversationState::Completed);

        engine.handle_message("buyer", "1 acorn fan to tampines").await;
        assert_eq!(engine.session_state("buyer").await, Some(ConversationState::AwaitingConfirmation));
    }

    #[tokio::test]
    async fn reset_removes_the_session() {
        let engine = engine();
        engine.handle_message("buyer", "2 tecno hoods please").await;

        assert!(engine.reset("buyer").await);
        assert_eq!(engine.session_state("buyer").await, None);
    }
}
