use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::catalog::MatchCandidate;
use crate::domain::intent::{ParsedIntent, ProductMention};
use crate::domain::order::{DeliveryDetails, Order, OrderId, OrderLine, OrderStatus};
use crate::domain::product::ProductId;
use crate::errors::DomainError;
use crate::ordering::pricing::{self, PricingPolicy};

/// Lines matched below this score ask the buyer to double-check.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_ORDER_ID_PREFIX: &str = "UB";
pub const UNMATCHED_NOTE: &str = "Product not found in catalog - requires manual matching";

const BRAND_HINT_BONUS: f64 = 0.2;
const CATEGORY_HINT_BONUS: f64 = 0.1;

/// Turns a parsed intent plus matcher output into a priced draft [`Order`].
#[derive(Clone, Debug)]
pub struct OrderAssembler {
    policy: PricingPolicy,
    order_id_prefix: String,
}

impl Default for OrderAssembler {
    fn default() -> Self {
        Self::new(PricingPolicy::default(), DEFAULT_ORDER_ID_PREFIX)
    }
}

impl OrderAssembler {
    pub fn new(policy: PricingPolicy, order_id_prefix: impl Into<String>) -> Self {
        Self { policy, order_id_prefix: order_id_prefix.into() }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// `candidates` holds one entry per mention, in mention order, with `None` where the
    /// matcher found nothing. A list of any other length is treated as an unaligned pool
    /// and every mention picks from it by brand/category hints. Never fails; unresolved
    /// mentions become UNMATCHED lines.
    pub fn extract(
        &self,
        intent: &ParsedIntent,
        candidates: &[Option<MatchCandidate>],
        source_text: &str,
    ) -> Order {
        self.extract_at(intent, candidates, source_text, Utc::now())
    }

    pub fn extract_at(
        &self,
        intent: &ParsedIntent,
        candidates: &[Option<MatchCandidate>],
        source_text: &str,
        now: DateTime<Utc>,
    ) -> Order {
        let aligned = candidates.len() == intent.mentions.len();
        let pool = candidates.iter().flatten().cloned().collect::<Vec<_>>();

        let lines = intent
            .mentions
            .iter()
            .enumerate()
            .map(|(index, mention)| {
                let matched = if aligned {
                    candidates.get(index).and_then(Option::as_ref)
                } else {
                    best_candidate(mention, &pool)
                };
                let quantity = mention.quantity.unwrap_or(1);
                match matched {
                    Some(candidate) => {
                        Self::line_from_candidate(candidate, quantity, Some(mention.raw_text.clone()))
                    }
                    None => unmatched_line(mention, quantity),
                }
            })
            .collect::<Vec<_>>();

        let totals = pricing::compute_totals(&lines, &self.policy);
        let delivery = delivery_from_intent(intent);
        let confidence = order_confidence(&lines, Some(intent.confidence));
        let clarification = Some(intent).filter(|intent| intent.needs_clarification);
        let (needs_confirmation, confirmation_notes) = review_lines(&lines, delivery.is_some(), clarification);

        let order = Order {
            order_id: OrderId::generate(&self.order_id_prefix, now),
            lines,
            totals,
            delivery,
            customer_name: intent.customer_name.clone(),
            customer_contact: intent.contact.clone(),
            source_text: source_text.to_string(),
            confidence,
            needs_confirmation,
            confirmation_notes,
            created_at: now,
            status: OrderStatus::Draft,
        };

        info!(
            event_name = "order.assembled",
            order_id = %order.order_id,
            line_count = order.lines.len(),
            unmatched = order.unmatched_count(),
            needs_confirmation = order.needs_confirmation,
            total = %order.totals.total,
            "draft order assembled"
        );
        order
    }

    /// An order with no lines, used when the buyer builds an order item by item.
    pub fn empty_draft(&self, source_text: &str) -> Order {
        let now = Utc::now();
        let lines = Vec::new();
        Order {
            order_id: OrderId::generate(&self.order_id_prefix, now),
            totals: pricing::compute_totals(&lines, &self.policy),
            lines,
            delivery: None,
            customer_name: None,
            customer_contact: None,
            source_text: source_text.to_string(),
            confidence: 0.0,
            needs_confirmation: true,
            confirmation_notes: Vec::new(),
            created_at: now,
            status: OrderStatus::Draft,
        }
    }

    pub fn line_from_candidate(candidate: &MatchCandidate, quantity: u32, notes: Option<String>) -> OrderLine {
        OrderLine {
            product_id: candidate.record_id.clone(),
            product_name: candidate.normalized_name.clone(),
            quantity,
            unit_price: candidate.price,
            line_total: pricing::line_total(candidate.price, quantity),
            brand: candidate.brand.clone(),
            category: candidate.category.clone(),
            notes,
            match_confidence: candidate.score,
        }
    }

    /// Adds a line, re-prices the order and re-runs the review against the new lines.
    /// Any applied discount is dropped. `intent` is the inquiry the draft came from, if any.
    pub fn append_line(&self, order: &mut Order, line: OrderLine, intent: Option<&ParsedIntent>) {
        order.lines.push(line);
        order.totals = pricing::compute_totals(&order.lines, &self.policy);
        order.confidence = order_confidence(&order.lines, intent.map(|intent| intent.confidence));

        let clarification = intent.filter(|intent| intent.needs_clarification);
        let (needs_confirmation, confirmation_notes) =
            review_lines(&order.lines, order.has_delivery(), clarification);
        order.needs_confirmation = needs_confirmation;
        order.confirmation_notes = confirmation_notes;

        debug!(
            event_name = "order.line_appended",
            order_id = %order.order_id,
            line_count = order.lines.len(),
            needs_confirmation = order.needs_confirmation,
            "order line appended"
        );
    }

    pub fn apply_discount(&self, order: &mut Order, percent: Decimal) {
        order.totals = pricing::apply_discount(&order.totals, percent, &self.policy);
    }

    /// Confirmation is the buyer's decision, so the triggers are not re-checked here.
    pub fn confirm_order(&self, order: &mut Order) -> Result<(), DomainError> {
        order.confirm()
    }

    pub fn render_summary(&self, order: &Order) -> String {
        let items = order
            .lines
            .iter()
            .map(|line| {
                format!(
                    "• {}\n  Qty: {} × {} = {}",
                    line.product_name,
                    line.quantity,
                    money_or_tbd(line.unit_price),
                    money_or_tbd(line.line_total)
                )
            })
            .collect::<Vec<_>>();

        let totals = &order.totals;
        let mut summary = items.join("\n");
        let _ = write!(summary, "\n\n*Subtotal:* ${:.2}", totals.subtotal);
        if totals.discount > Decimal::ZERO {
            let _ = write!(summary, "\n*Discount:* -${:.2}", totals.discount);
        }
        if totals.tax > Decimal::ZERO {
            let _ = write!(summary, "\n*GST ({}%):* ${:.2}", self.policy.tax_percent(), totals.tax);
        }
        if totals.shipping > Decimal::ZERO {
            let _ = write!(summary, "\n*Shipping:* ${:.2}", totals.shipping);
        }
        let _ = write!(summary, "\n*Total:* ${:.2} {}", totals.total, totals.currency);
        summary
    }
}

fn money_or_tbd(amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        format!("${amount:.2}")
    } else {
        "TBD".to_string()
    }
}

/// Highest candidate score after brand/category hints; the first candidate wins a tie.
fn best_candidate<'a>(mention: &ProductMention, candidates: &'a [MatchCandidate]) -> Option<&'a MatchCandidate> {
    let brand = mention.brand.as_deref().map(str::to_lowercase).filter(|brand| !brand.is_empty());
    let category = mention.category.as_deref().map(str::to_lowercase).filter(|category| !category.is_empty());

    let mut best: Option<(&MatchCandidate, f64)> = None;
    for candidate in candidates {
        let mut score = candidate.score;
        if brand.as_deref().is_some_and(|brand| candidate.display_name.to_lowercase().contains(brand)) {
            score += BRAND_HINT_BONUS;
        }
        if category.as_deref().is_some_and(|category| {
            candidate.category.as_deref().is_some_and(|value| value.to_lowercase() == category)
        }) {
            score += CATEGORY_HINT_BONUS;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

fn unmatched_line(mention: &ProductMention, quantity: u32) -> OrderLine {
    OrderLine {
        product_id: ProductId::unmatched(),
        product_name: mention.raw_text.clone(),
        quantity,
        unit_price: Decimal::ZERO,
        line_total: Decimal::ZERO,
        brand: mention.brand.clone(),
        category: mention.category.clone(),
        notes: Some(UNMATCHED_NOTE.to_string()),
        match_confidence: 0.0,
    }
}

fn delivery_from_intent(intent: &ParsedIntent) -> Option<DeliveryDetails> {
    let preference = intent.delivery.as_ref()?;
    let address = preference.address.as_deref().map(str::trim).filter(|address| !address.is_empty())?;

    Some(DeliveryDetails {
        address: address.to_string(),
        city: DeliveryDetails::DEFAULT_CITY.to_string(),
        postal_code: None,
        contact_name: intent.customer_name.clone(),
        contact_phone: intent.contact.clone(),
        preferred_date: preference.date.clone(),
        preferred_time: None,
        urgency: preference.urgency,
        instructions: preference.notes.clone(),
    })
}

/// Without an intent the line mean stands in for the intent term.
fn order_confidence(lines: &[OrderLine], intent_confidence: Option<f64>) -> f64 {
    let mean = if lines.is_empty() {
        0.0
    } else {
        lines.iter().map(|line| line.match_confidence).sum::<f64>() / lines.len() as f64
    };
    let intent_confidence = intent_confidence.unwrap_or(mean);
    ((mean * 0.6 + intent_confidence * 0.4) * 100.0).round() / 100.0
}

/// One note per fired trigger, plus the questions of an intent that asked for clarification.
fn review_lines(
    lines: &[OrderLine],
    has_delivery: bool,
    clarification: Option<&ParsedIntent>,
) -> (bool, Vec<String>) {
    let mut notes = Vec::new();

    let unmatched = lines.iter().filter(|line| line.is_unmatched()).count();
    if unmatched > 0 {
        notes.push(format!("{unmatched} product(s) could not be matched - manual selection required"));
    }

    let low_confidence = lines
        .iter()
        .filter(|line| !line.is_unmatched() && line.match_confidence < LOW_CONFIDENCE_THRESHOLD)
        .count();
    if low_confidence > 0 {
        notes.push(format!("{low_confidence} product(s) have low match confidence - please verify"));
    }

    if lines.iter().any(|line| line.quantity == 0) {
        notes.push("Some items are missing quantities".to_string());
    }

    if !has_delivery {
        notes.push("Delivery address required".to_string());
    }

    if let Some(intent) = clarification {
        notes.extend(intent.clarification_questions.iter().cloned());
    }

    let needs_confirmation = clarification.is_some() || !notes.is_empty();
    (needs_confirmation, notes)
}
