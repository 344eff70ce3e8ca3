use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::intent::Urgency;
use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// `<PREFIX>-<YYYYMMDD>-<6 upper-case hex>`, e.g. `UB-20260131-3FA9C1`.
    pub fn generate(prefix: &str, now: DateTime<Utc>) -> Self {
        let unique = Uuid::new_v4().simple().to_string();
        let unique = unique[..6].to_ascii_uppercase();
        Self(format!("{prefix}-{}-{unique}", now.format("%Y%m%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub match_confidence: f64,
}

impl OrderLine {
    pub fn is_unmatched(&self) -> bool {
        self.product_id.is_unmatched()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub urgency: Urgency,
    pub instructions: Option<String>,
}

impl DeliveryDetails {
    pub const DEFAULT_CITY: &'static str = "Singapore";

    /// Free-text capture from the delivery prompt; the whole reply is kept as both
    /// address and instructions.
    pub fn from_free_text(text: &str) -> Self {
        let text = text.trim().to_string();
        Self {
            address: text.clone(),
            city: Self::DEFAULT_CITY.to_string(),
            postal_code: None,
            contact_name: None,
            contact_phone: None,
            preferred_date: None,
            preferred_time: None,
            urgency: Urgency::None,
            instructions: Some(text),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub delivery: Option<DeliveryDetails>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub source_text: String,
    pub confidence: f64,
    pub needs_confirmation: bool,
    pub confirmation_notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self.status, next),
            (OrderStatus::Draft, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Draft, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidOrderTransition { from: self.status, to: next })
    }

    /// Buyer confirmation. Does not re-check the confirmation triggers; repeated calls
    /// leave the order unchanged.
    pub fn confirm(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Confirmed)?;
        self.needs_confirmation = false;
        Ok(())
    }

    pub fn mark_shipped(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Shipped)
    }

    pub fn mark_delivered(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Delivered)
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Cancelled)
    }

    pub fn has_delivery(&self) -> bool {
        self.delivery.as_ref().is_some_and(|delivery| !delivery.address.trim().is_empty())
    }

    pub fn unmatched_count(&self) -> usize {
        self.lines.iter().filter(|line| line.is_unmatched()).count()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{Order, OrderId, OrderStatus, OrderTotals};
    use crate::errors::DomainError;

    fn order(status: OrderStatus) -> Order {
        Order {
            order_id: OrderId("UB-20260131-ABC123".to_string()),
            lines: Vec::new(),
            totals: OrderTotals {
                subtotal: Decimal::ZERO,
                discount: Decimal::ZERO,
                tax: Decimal::ZERO,
                shipping: Decimal::new(50, 0),
                total: Decimal::new(50, 0),
                currency: "SGD".to_string(),
            },
            delivery: None,
            customer_name: None,
            customer_contact: None,
            source_text: String::new(),
            confidence: 0.0,
            needs_confirmation: true,
            confirmation_notes: Vec::new(),
            created_at: Utc::now(),
            status,
        }
    }

    #[test]
    fn generated_ids_follow_prefix_date_hex_layout() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 9, 30, 0).single().expect("valid timestamp");
        let id = OrderId::generate("UB", now);
        let parts = id.as_str().split('-').collect::<Vec<_>>();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "UB");
        assert_eq!(parts[1], "20260131");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn confirm_is_idempotent() {
        let mut order = order(OrderStatus::Draft);
        order.confirm().expect("draft -> confirmed");
        let snapshot = order.clone();
        order.confirm().expect("confirmed -> confirmed");

        assert_eq!(order, snapshot);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(!order.needs_confirmation);
    }

    #[test]
    fn fulfilment_lifecycle_runs_forward_only() {
        let mut order = order(OrderStatus::Draft);
        let error = order.mark_shipped().expect_err("draft cannot ship");
        assert!(matches!(
            error,
            DomainError::InvalidOrderTransition { from: OrderStatus::Draft, to: OrderStatus::Shipped }
        ));

        order.confirm().expect("draft -> confirmed");
        order.mark_shipped().expect("confirmed -> shipped");
        order.mark_delivered().expect("shipped -> delivered");
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.cancel().is_err());
    }

    #[test]
    fn cancelled_orders_cannot_be_confirmed() {
        let mut order = order(OrderStatus::Draft);
        order.cancel().expect("draft -> cancelled");
        assert!(order.confirm().is_err());
        assert!(order.needs_confirmation);
    }
}
