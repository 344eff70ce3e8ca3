use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use ordercopilot_core::catalog::vocabulary::{detect_intent_brand, detect_intent_category, detect_locality};
use ordercopilot_core::domain::intent::{
    DeliveryPreference, IntentKind, ParsedIntent, ProductMention, Urgency,
};

use crate::llm::{CompletionService, PatternCompletionService};
use crate::prompts::{render_user_prompt, SYSTEM_PROMPT};

const PATTERN_CONFIDENCE: f64 = 0.5;
const PATTERN_MENTION_CONFIDENCE: f64 = 0.6;
const DEFAULT_CONFIDENCE: f64 = 0.5;

pub const ASK_FOR_PRODUCTS: &str = "Could you please specify which products you're interested in?";
pub const ASK_FOR_MODEL: &str = "Could you provide more details about the specific model you need?";
pub const ASK_FOR_QUANTITY: &str = "How many units do you need?";

/// Turns a buyer message into a [`ParsedIntent`]. Tries the completion service first and
/// falls back to keyword parsing on any failure, so extraction itself never fails.
#[derive(Clone)]
pub struct IntentExtractor {
    service: Arc<dyn CompletionService>,
}

impl Default for IntentExtractor {
    fn default() -> Self {
        Self::new(Arc::new(PatternCompletionService))
    }
}

impl IntentExtractor {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub async fn extract(&self, message: &str) -> ParsedIntent {
        if message.trim().is_empty() {
            return ParsedIntent::empty(message);
        }

        let value = match self.service.complete(SYSTEM_PROMPT, &render_user_prompt(message)).await {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    event_name = "intent.completion_fallback",
                    reason = "service_error",
                    error = %error,
                    "completion service failed; using pattern parser"
                );
                return self.extract_sync(message);
            }
        };

        match IntentPayload::decode(value) {
            Ok(payload) => {
                let intent = payload.into_intent(message);
                debug!(
                    event_name = "intent.extracted",
                    intent_kind = intent.intent_kind.as_str(),
                    mentions = intent.mentions.len(),
                    confidence = intent.confidence,
                    "intent extracted"
                );
                intent
            }
            Err(error) => {
                warn!(
                    event_name = "intent.completion_fallback",
                    reason = "schema_mismatch",
                    error = %error,
                    "completion payload did not match the intent shape; using pattern parser"
                );
                self.extract_sync(message)
            }
        }
    }

    /// Deterministic keyword parse only; never calls the completion service.
    pub fn extract_sync(&self, message: &str) -> ParsedIntent {
        if message.trim().is_empty() {
            return ParsedIntent::empty(message);
        }
        pattern_payload(message).into_intent(message)
    }
}

/// The completion JSON shape. Every field tolerates absence and `null`; wrong types
/// and unknown enum values are rejected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentPayload {
    #[serde(default)]
    pub intent_type: Option<IntentKind>,
    #[serde(default)]
    pub products: Option<Vec<MentionPayload>>,
    #[serde(default)]
    pub delivery: Option<DeliveryPayload>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub needs_clarification: Option<bool>,
    #[serde(default)]
    pub clarification_questions: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionPayload {
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub specifications: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IntentPayload {
    pub fn decode(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn into_intent(self, raw_message: &str) -> ParsedIntent {
        let mentions = self
            .products
            .unwrap_or_default()
            .into_iter()
            .map(MentionPayload::into_mention)
            .collect();

        ParsedIntent {
            intent_kind: self.intent_type.unwrap_or(IntentKind::Unclear),
            mentions,
            delivery: self.delivery.map(|delivery| DeliveryPreference {
                address: delivery.address,
                date: delivery.date,
                urgency: delivery.urgency.unwrap_or_default(),
                notes: delivery.notes,
            }),
            customer_name: self.customer_name,
            contact: self.contact_info,
            raw_message: raw_message.to_string(),
            confidence: unit_interval(self.confidence_score.unwrap_or(DEFAULT_CONFIDENCE)),
            needs_clarification: self.needs_clarification.unwrap_or(false),
            clarification_questions: self.clarification_questions.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
        }
    }
}

impl MentionPayload {
    fn into_mention(self) -> ProductMention {
        ProductMention {
            raw_text: self.raw_text.unwrap_or_default(),
            product_name: self.product_name,
            quantity: self.quantity.map(|quantity| u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)),
            brand: self.brand,
            category: self.category,
            specifications: self.specifications.unwrap_or_default(),
            confidence: unit_interval(self.confidence.unwrap_or(DEFAULT_CONFIDENCE)),
        }
    }
}

fn unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Keyword parse of `message` in the completion payload shape.
pub fn pattern_payload(message: &str) -> IntentPayload {
    let lowered = message.to_lowercase();

    let intent_type = if contains_any(&lowered, &["price", "cost", "how much"]) {
        IntentKind::PriceCheck
    } else if contains_any(&lowered, &["stock", "available", "availability"]) {
        IntentKind::StockCheck
    } else if contains_any(&lowered, &["status", "where is", "tracking"]) {
        IntentKind::OrderStatus
    } else {
        IntentKind::OrderInquiry
    };

    let brand = detect_intent_brand(&lowered);
    let category = detect_intent_category(&lowered);
    let quantity = first_number(&lowered);

    let products = if brand.is_some() || category.is_some() {
        vec![MentionPayload {
            raw_text: Some(message.to_string()),
            product_name: None,
            quantity: quantity.map(i64::from),
            brand: brand.map(str::to_string),
            category: category.map(str::to_string),
            specifications: Some(BTreeMap::new()),
            confidence: Some(PATTERN_MENTION_CONFIDENCE),
        }]
    } else {
        Vec::new()
    };

    let mut clarification_questions = Vec::new();
    match products.first() {
        None => clarification_questions.push(ASK_FOR_PRODUCTS.to_string()),
        Some(mention) if mention.product_name.is_none() => {
            clarification_questions.push(ASK_FOR_MODEL.to_string())
        }
        Some(_) => {}
    }
    if quantity.is_none() {
        clarification_questions.push(ASK_FOR_QUANTITY.to_string());
    }

    let mut summary = format!("Request for {}", category.unwrap_or("products"));
    if let Some(brand) = brand {
        summary.push_str(&format!(" from {brand}"));
    }

    IntentPayload {
        intent_type: Some(intent_type),
        needs_clarification: Some(products.is_empty() || quantity.is_none()),
        products: Some(products),
        delivery: Some(DeliveryPayload {
            address: detect_locality(&lowered),
            date: None,
            urgency: detect_urgency(&lowered),
            notes: None,
        }),
        customer_name: None,
        contact_info: None,
        confidence_score: Some(PATTERN_CONFIDENCE),
        clarification_questions: Some(clarification_questions),
        summary: Some(summary),
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

/// "no rush" is a flexible request, not an urgent one.
fn detect_urgency(lowered: &str) -> Option<Urgency> {
    let rush = lowered.contains("rush") && !lowered.contains("no rush");
    if rush || contains_any(lowered, &["urgent", "asap"]) {
        Some(Urgency::Urgent)
    } else if contains_any(lowered, &["next week", "no rush"]) {
        Some(Urgency::Flexible)
    } else {
        None
    }
}

/// The first run of ASCII digits, saturating at `u32::MAX`.
fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|character: char| character.is_ascii_digit())?;
    let digits = &text[start..];
    let end = digits.find(|character: char| !character.is_ascii_digit()).unwrap_or(digits.len());
    Some(digits[..end].parse().unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use ordercopilot_core::domain::intent::{IntentKind, Urgency};

    use super::{first_number, IntentExtractor, ASK_FOR_MODEL, ASK_FOR_PRODUCTS, ASK_FOR_QUANTITY};
    use crate::llm::CompletionService;

    struct FixedService(Value);

    #[async_trait]
    impl CompletionService for FixedService {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingService;

    #[async_trait]
    impl CompletionService for FailingService {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<Value> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn acorn_bedok_message_parses_brand_category_quantity_and_delivery() {
        let intent = IntentExtractor::default()
            .extract_sync("I need 10 Acorn ceiling fans, deliver to Bedok next week");

        assert_eq!(intent.intent_kind, IntentKind::OrderInquiry);
        assert_eq!(intent.mentions.len(), 1);
        let mention = &intent.mentions[0];
        assert_eq!(mention.quantity, Some(10));
        assert_eq!(mention.brand.as_deref(), Some("Acorn"));
        assert_eq!(mention.category.as_deref(), Some("Ceiling Fans"));
        assert_eq!(mention.confidence, 0.6);

        let delivery = intent.delivery.expect("pattern path always reports delivery");
        assert_eq!(delivery.address.as_deref(), Some("Bedok"));
        assert_eq!(delivery.urgency, Urgency::Flexible);
        assert_eq!(intent.confidence, 0.5);
        assert!(intent.needs_clarification);
        assert_eq!(intent.clarification_questions, vec![ASK_FOR_MODEL.to_string()]);
        assert_eq!(intent.summary, "Request for Ceiling Fans from Acorn");
    }

    #[test]
    fn keyword_priority_decides_intent_kind() {
        let extractor = IntentExtractor::default();
        assert_eq!(extractor.extract_sync("price and stock of tecno hobs").intent_kind, IntentKind::PriceCheck);
        assert_eq!(extractor.extract_sync("is the pozzi tap available").intent_kind, IntentKind::StockCheck);
        assert_eq!(extractor.extract_sync("where is my order").intent_kind, IntentKind::OrderStatus);
        assert_eq!(extractor.extract_sync("hello there").intent_kind, IntentKind::OrderInquiry);
    }

    #[test]
    fn message_without_products_asks_for_them() {
        let intent = IntentExtractor::default().extract_sync("hello there");
        assert!(intent.mentions.is_empty());
        assert!(intent.needs_clarification);
        assert_eq!(
            intent.clarification_questions,
            vec![ASK_FOR_PRODUCTS.to_string(), ASK_FOR_QUANTITY.to_string()]
        );
        assert_eq!(intent.summary, "Request for products");
    }

    #[test]
    fn plain_tap_is_a_kitchen_tap_and_okay_is_not_a_brand() {
        let extractor = IntentExtractor::default();

        let taps = extractor.extract_sync("need 5 taps");
        assert_eq!(taps.mentions.len(), 1);
        assert_eq!(taps.mentions[0].category.as_deref(), Some("Kitchen Taps"));
        assert_eq!(taps.mentions[0].quantity, Some(5));

        let sinks = extractor.extract_sync("okay, need 5 kitchen sinks");
        assert_eq!(sinks.mentions.len(), 1);
        assert_eq!(sinks.mentions[0].brand, None);
        assert_eq!(sinks.mentions[0].category.as_deref(), Some("Kitchen Sinks"));
    }

    #[test]
    fn urgency_keywords() {
        let extractor = IntentExtractor::default();
        let urgency = |text: &str| extractor.extract_sync(text).delivery.map(|delivery| delivery.urgency);

        assert_eq!(urgency("need 2 fans asap"), Some(Urgency::Urgent));
        assert_eq!(urgency("rush order 2 fans"), Some(Urgency::Urgent));
        assert_eq!(urgency("2 fans, no rush"), Some(Urgency::Flexible));
        assert_eq!(urgency("2 fans"), Some(Urgency::None));
    }

    #[test]
    fn first_number_takes_the_leading_digit_run() {
        assert_eq!(first_number("need 12pcs and 3 sets"), Some(12));
        assert_eq!(first_number("no digits here"), None);
        assert_eq!(first_number("99999999999 fans"), Some(u32::MAX));
        assert_eq!(first_number("0004 hoods"), Some(4));
    }

    #[tokio::test]
    async fn empty_message_is_unclear_with_one_question() {
        let intent = IntentExtractor::new(Arc::new(FailingService)).extract("   ").await;
        assert_eq!(intent.intent_kind, IntentKind::Unclear);
        assert_eq!(intent.confidence, 0.0);
        assert!(intent.needs_clarification);
        assert_eq!(intent.clarification_questions.len(), 1);
    }

    #[tokio::test]
    async fn service_failure_falls_back_to_pattern_parse() {
        let message = "need 4 makita drills";
        let fallback = IntentExtractor::new(Arc::new(FailingService)).extract(message).await;
        assert_eq!(fallback, IntentExtractor::default().extract_sync(message));
        assert_eq!(fallback.mentions[0].quantity, Some(4));
    }

    #[tokio::test]
    async fn completion_payload_is_decoded_with_defaults() {
        let service = FixedService(json!({
            "intent_type": "order_inquiry",
            "products": [
                { "raw_text": "5 spin fans", "product_name": "Spin 42", "quantity": 5, "confidence": 1.7 },
                { "raw_text": "a hood", "quantity": -3, "brand": null }
            ],
            "delivery": { "address": "12 Kovan Rd", "urgency": null },
            "contact_info": "91234567",
            "clarification_questions": null
        }));
        let intent = IntentExtractor::new(Arc::new(service)).extract("5 spin fans and a hood").await;

        assert_eq!(intent.intent_kind, IntentKind::OrderInquiry);
        assert_eq!(intent.mentions.len(), 2);
        assert_eq!(intent.mentions[0].confidence, 1.0);
        assert_eq!(intent.mentions[0].quantity, Some(5));
        assert_eq!(intent.mentions[1].quantity, Some(0));
        assert_eq!(intent.mentions[1].confidence, 0.5);
        let delivery = intent.delivery.expect("delivery decoded");
        assert_eq!(delivery.urgency, Urgency::None);
        assert_eq!(intent.contact.as_deref(), Some("91234567"));
        assert_eq!(intent.confidence, 0.5);
        assert!(!intent.needs_clarification);
        assert!(intent.clarification_questions.is_empty());
        assert_eq!(intent.raw_message, "5 spin fans and a hood");
    }

    #[tokio::test]
    async fn schema_mismatch_falls_back_to_pattern_parse() {
        let message = "need 4 makita drills";
        for bad in [
            json!({ "intent_type": "place_order" }),
            json!({ "products": "four drills" }),
            json!({ "products": [{ "quantity": "four" }] }),
            json!({ "delivery": { "urgency": "whenever" } }),
        ] {
            let intent = IntentExtractor::new(Arc::new(FixedService(bad))).extract(message).await;
            assert_eq!(intent, IntentExtractor::default().extract_sync(message));
        }
    }

    #[tokio::test]
    async fn default_extractor_matches_sync_path() {
        let message = "how much for 3 makita drills, urgent";
        let intent = IntentExtractor::default().extract(message).await;
        assert_eq!(intent, IntentExtractor::default().extract_sync(message));
        assert_eq!(intent.intent_kind, IntentKind::PriceCheck);
    }

    proptest! {
        #[test]
        fn quantity_equals_the_number_in_the_message(
            quantity in 0u32..1_000_000,
            unit in prop::sample::select(vec!["", " ", " unit", " units", "pcs", " pcs", " piece", " pieces", " set", " sets"]),
        ) {
            let message = format!("please send {quantity}{unit} acorn fans to hougang");
            let intent = IntentExtractor::default().extract_sync(&message);
            prop_assert_eq!(intent.mentions.len(), 1);
            prop_assert_eq!(intent.mentions[0].quantity, Some(quantity));
        }

        #[test]
        fn messages_without_digits_have_no_quantity(text in "[a-z ]{1,40}") {
            let message = format!("acorn fan {text}");
            let intent = IntentExtractor::default().extract_sync(&message);
            prop_assert_eq!(intent.mentions[0].quantity, None);
        }
    }
}
