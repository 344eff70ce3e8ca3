//! Transport-neutral replies produced by the conversation engine.
//!
//! Constructors clamp every list and label to what chat clients accept, so a caller
//! can hand any action straight to its transport.

use serde::{Deserialize, Serialize};

use ordercopilot_core::catalog::MatchCandidate;
use ordercopilot_core::domain::order::{Order, OrderId};

pub const MAX_BUTTONS: usize = 3;
pub const MAX_BUTTON_LABEL_CHARS: usize = 20;
pub const MAX_LIST_ROWS: usize = 10;
pub const MAX_ROW_TITLE_CHARS: usize = 24;
pub const MAX_ROW_DESCRIPTION_CHARS: usize = 72;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub label: String,
}

impl Button {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: truncate_chars(&label.into(), MAX_BUTTON_LABEL_CHARS) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl ListRow {
    pub fn new(id: impl Into<String>, title: &str, description: &str) -> Self {
        Self {
            id: id.into(),
            title: truncate_chars(title, MAX_ROW_TITLE_CHARS),
            description: truncate_chars(description, MAX_ROW_DESCRIPTION_CHARS),
        }
    }

    /// Row whose id is the `product_<id>` selection token.
    pub fn for_candidate(candidate: &MatchCandidate) -> Self {
        Self::new(
            selection_token(candidate.record_id.as_str()),
            &candidate.normalized_name,
            &format!("${:.2}", candidate.price),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundAction {
    SendText { body: String },
    SendInteractive { body: String, buttons: Vec<Button> },
    SendProductList { body: String, rows: Vec<ListRow> },
    OrderConfirmed { order_id: OrderId, order: Box<Order>, body: String },
}

impl OutboundAction {
    pub fn text(body: impl Into<String>) -> Self {
        Self::SendText { body: body.into() }
    }

    pub fn interactive(body: impl Into<String>, buttons: Vec<Button>) -> Self {
        let buttons = buttons.into_iter().take(MAX_BUTTONS).collect();
        Self::SendInteractive { body: body.into(), buttons }
    }

    pub fn product_list(body: impl Into<String>, rows: Vec<ListRow>) -> Self {
        let rows = rows.into_iter().take(MAX_LIST_ROWS).collect();
        Self::SendProductList { body: body.into(), rows }
    }

    pub fn order_confirmed(order: Order, body: impl Into<String>) -> Self {
        Self::OrderConfirmed { order_id: order.order_id.clone(), order: Box::new(order), body: body.into() }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::SendText { body }
            | Self::SendInteractive { body, .. }
            | Self::SendProductList { body, .. }
            | Self::OrderConfirmed { body, .. } => body,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendText { .. } => "send_text",
            Self::SendInteractive { .. } => "send_interactive",
            Self::SendProductList { .. } => "send_product_list",
            Self::OrderConfirmed { .. } => "order_confirmed",
        }
    }
}

pub const SELECTION_PREFIX: &str = "product_";

pub fn selection_token(product_id: &str) -> String {
    format!("{SELECTION_PREFIX}{product_id}")
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::{Button, ListRow, OutboundAction, MAX_BUTTONS, MAX_LIST_ROWS};

    #[test]
    fn constructors_clamp_to_client_limits() {
        let buttons = (0..5).map(|index| Button::new(format!("b{index}"), "A very long button label here")).collect();
        let action = OutboundAction::interactive("pick one", buttons);

        let OutboundAction::SendInteractive { buttons, .. } = action else {
            panic!("expected interactive action");
        };
        assert_eq!(buttons.len(), MAX_BUTTONS);
        assert!(buttons.iter().all(|button| button.label.chars().count() == 20));

        let rows = (0..12)
            .map(|index| ListRow::new(format!("product_{index}"), "Acorn DC Ceiling Fan 52 inch WiFi", &"x".repeat(100)))
            .collect();
        let OutboundAction::SendProductList { rows, .. } = OutboundAction::product_list("found", rows) else {
            panic!("expected product list");
        };
        assert_eq!(rows.len(), MAX_LIST_ROWS);
        assert_eq!(rows[0].title.chars().count(), 24);
        assert_eq!(rows[0].description.chars().count(), 72);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let button = Button::new("confirm_order", "✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅✅");
        assert_eq!(button.label.chars().count(), 20);
    }

    #[test]
    fn actions_serialize_with_kind_tag() {
        let value = serde_json::to_value(OutboundAction::text("hello")).expect("serialize");
        assert_eq!(value["kind"], "send_text");
        assert_eq!(value["body"], "hello");
        assert_eq!(OutboundAction::text("hello").kind(), "send_text");
    }
}
