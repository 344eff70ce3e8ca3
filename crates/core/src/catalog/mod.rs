pub mod matcher;
pub mod vocabulary;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::domain::product::{CatalogRecord, ProductId};
use crate::errors::ApplicationError;

pub use matcher::{MatchCandidate, MatchQuery, MatchResult, ProductMatcher};

/// In-memory catalog shared between requests.
///
/// Readers take a snapshot per scan; [`CatalogIndex::replace`] swaps the whole list so a
/// scan never observes a half-applied reload.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    records: ArcSwap<Vec<CatalogRecord>>,
}

impl CatalogIndex {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records: ArcSwap::from_pointee(records) }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ApplicationError> {
        let records = serde_json::from_str::<Vec<CatalogRecord>>(raw)
            .map_err(|error| ApplicationError::Catalog(format!("invalid catalog json: {error}")))?;
        Ok(Self::new(records))
    }

    pub fn load(path: &Path) -> Result<Self, ApplicationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ApplicationError::Catalog(format!("could not read `{}`: {error}", path.display()))
        })?;
        let index = Self::from_json_str(&raw)?;
        info!(
            event_name = "catalog.loaded",
            path = %path.display(),
            record_count = index.len(),
            "catalog loaded"
        );
        Ok(index)
    }

    pub fn snapshot(&self) -> Arc<Vec<CatalogRecord>> {
        self.records.load_full()
    }

    pub fn replace(&self, records: Vec<CatalogRecord>) {
        let record_count = records.len();
        self.records.store(Arc::new(records));
        info!(event_name = "catalog.replaced", record_count, "catalog snapshot replaced");
    }

    pub fn find(&self, product_id: &ProductId) -> Option<CatalogRecord> {
        self.records.load().iter().find(|record| &record.id == product_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::CatalogIndex;
    use crate::domain::product::{CatalogRecord, ProductId};
    use crate::errors::ApplicationError;

    fn record(id: &str, name: &str) -> CatalogRecord {
        CatalogRecord {
            id: ProductId(id.to_string()),
            display_name: name.to_string(),
            normalized_name: name.to_string(),
            price: Decimal::new(10_000, 2),
            original_price: None,
            brand: None,
            category: None,
            url: String::new(),
            image_ref: None,
        }
    }

    #[test]
    fn snapshot_taken_before_replace_is_unaffected() {
        let index = CatalogIndex::new(vec![record("A", "Acorn Fan")]);
        let before = index.snapshot();

        index.replace(vec![record("B", "Tecno Hood"), record("C", "Pozzi Tap")]);

        assert_eq!(before.len(), 1);
        assert_eq!(index.len(), 2);
        assert!(index.find(&ProductId("A".to_string())).is_none());
        assert!(index.find(&ProductId("C".to_string())).is_some());
    }

    #[test]
    fn malformed_json_is_a_catalog_error() {
        let error = CatalogIndex::from_json_str("{\"not\": \"a list\"}").expect_err("must fail");
        assert!(matches!(error, ApplicationError::Catalog(_)));
    }

    #[test]
    fn default_index_is_empty() {
        let index = CatalogIndex::default();
        assert!(index.is_empty());
        assert!(index.snapshot().is_empty());
    }
}
