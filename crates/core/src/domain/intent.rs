use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    OrderInquiry,
    PriceCheck,
    StockCheck,
    OrderStatus,
    GeneralQuestion,
    Unclear,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderInquiry => "order_inquiry",
            Self::PriceCheck => "price_check",
            Self::StockCheck => "stock_check",
            Self::OrderStatus => "order_status",
            Self::GeneralQuestion => "general_question",
            Self::Unclear => "unclear",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Urgent,
    Normal,
    Flexible,
    #[default]
    None,
}

/// A single product reference pulled out of a buyer message, before catalog resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductMention {
    pub raw_text: String,
    pub product_name: Option<String>,
    pub quantity: Option<u32>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub specifications: BTreeMap<String, Value>,
    pub confidence: f64,
}

impl ProductMention {
    /// Text handed to the matcher: the resolved name when there is one, else the raw text.
    pub fn search_text(&self) -> &str {
        self.product_name.as_deref().filter(|name| !name.trim().is_empty()).unwrap_or(&self.raw_text)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPreference {
    pub address: Option<String>,
    pub date: Option<String>,
    pub urgency: Urgency,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent_kind: IntentKind,
    pub mentions: Vec<ProductMention>,
    pub delivery: Option<DeliveryPreference>,
    pub customer_name: Option<String>,
    pub contact: Option<String>,
    pub raw_message: String,
    pub confidence: f64,
    pub needs_clarification: bool,
    pub clarification_questions: Vec<String>,
    pub summary: String,
}

impl ParsedIntent {
    pub fn empty(raw_message: impl Into<String>) -> Self {
        Self {
            intent_kind: IntentKind::Unclear,
            mentions: Vec::new(),
            delivery: None,
            customer_name: None,
            contact: None,
            raw_message: raw_message.into(),
            confidence: 0.0,
            needs_clarification: true,
            clarification_questions: vec![
                "Could you please describe what you're looking for?".to_string()
            ],
            summary: "Empty or unclear message".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{IntentKind, ParsedIntent, ProductMention};

    #[test]
    fn empty_intent_asks_exactly_one_question() {
        let intent = ParsedIntent::empty("   ");
        assert_eq!(intent.intent_kind, IntentKind::Unclear);
        assert_eq!(intent.confidence, 0.0);
        assert!(intent.needs_clarification);
        assert_eq!(intent.clarification_questions.len(), 1);
    }

    #[test]
    fn search_text_prefers_resolved_product_name() {
        let mut mention = ProductMention {
            raw_text: "need 5 of those acorn fans".to_string(),
            product_name: Some("Acorn DC Ceiling Fan".to_string()),
            quantity: Some(5),
            brand: Some("Acorn".to_string()),
            category: None,
            specifications: BTreeMap::new(),
            confidence: 0.9,
        };
        assert_eq!(mention.search_text(), "Acorn DC Ceiling Fan");

        mention.product_name = Some("  ".to_string());
        assert_eq!(mention.search_text(), "need 5 of those acorn fans");
    }
}
