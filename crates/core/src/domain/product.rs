use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub const UNMATCHED: &'static str = "UNMATCHED";

    pub fn unmatched() -> Self {
        Self(Self::UNMATCHED.to_string())
    }

    pub fn is_unmatched(&self) -> bool {
        self.0 == Self::UNMATCHED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog entry as loaded by the ingestion pipeline. Read-only inside the core.
///
/// Field aliases accept the scraper's export format (`item_id`, `name`, `clean_name`,
/// `image_path`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(alias = "item_id")]
    pub id: ProductId,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(alias = "clean_name", default)]
    pub normalized_name: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(alias = "image_path", default)]
    pub image_ref: Option<String>,
}

impl CatalogRecord {
    /// Name used for similarity scoring; falls back to the display name when the
    /// export carried no cleaned variant.
    pub fn match_name(&self) -> &str {
        if self.normalized_name.trim().is_empty() {
            &self.display_name
        } else {
            &self.normalized_name
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CatalogRecord, ProductId};

    #[test]
    fn deserializes_scraper_export_field_names() {
        let record: CatalogRecord = serde_json::from_str(
            r#"{
                "item_id": "AC-DC-52",
                "name": "Acorn DC Ceiling Fan 52\" (WiFi)",
                "clean_name": "Acorn DC Ceiling Fan",
                "price": "199.00",
                "url": "https://example.test/acorn-dc",
                "image_path": "images/acorn-dc.jpg"
            }"#,
        )
        .expect("scraper export should decode");

        assert_eq!(record.id, ProductId("AC-DC-52".to_string()));
        assert_eq!(record.price, Decimal::new(19_900, 2));
        assert_eq!(record.match_name(), "Acorn DC Ceiling Fan");
        assert_eq!(record.image_ref.as_deref(), Some("images/acorn-dc.jpg"));
        assert!(record.original_price.is_none());
    }

    #[test]
    fn match_name_falls_back_to_display_name() {
        let record: CatalogRecord = serde_json::from_str(
            r#"{"id": "X1", "display_name": "Tecno Gas Hob", "price": 320}"#,
        )
        .expect("minimal record should decode");

        assert_eq!(record.match_name(), "Tecno Gas Hob");
        assert!(!ProductId::unmatched().as_str().is_empty());
        assert!(ProductId::unmatched().is_unmatched());
    }
}
