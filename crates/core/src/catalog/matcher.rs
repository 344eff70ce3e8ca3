use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::vocabulary::{category_keywords, detect_brand, detect_category};
use crate::catalog::CatalogIndex;
use crate::domain::product::{CatalogRecord, ProductId};

const NAME_WEIGHT: f64 = 0.5;
const NAME_RATIO_FLOOR: f64 = 0.3;
const TOKEN_WEIGHT: f64 = 0.3;
const BRAND_BONUS: f64 = 0.2;
const CATEGORY_BONUS: f64 = 0.1;

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const DEFAULT_MIN_SCORE: f64 = 0.3;
pub const DEFAULT_LISTING_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub record_id: ProductId,
    pub display_name: String,
    pub normalized_name: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub url: String,
    pub image_ref: Option<String>,
    pub score: f64,
    pub reason: String,
}

impl MatchCandidate {
    fn from_record(record: &CatalogRecord, score: f64, reason: impl Into<String>) -> Self {
        let brand = record
            .brand
            .clone()
            .or_else(|| detect_brand(&record.display_name).map(str::to_string));
        let category = record
            .category
            .clone()
            .or_else(|| detect_category(&record.display_name).map(str::to_string));

        Self {
            record_id: record.id.clone(),
            display_name: record.display_name.clone(),
            normalized_name: record.match_name().to_string(),
            price: record.price,
            original_price: record.original_price,
            brand,
            category,
            url: record.url.clone(),
            image_ref: record.image_ref.clone(),
            score,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub query: String,
    pub matches: Vec<MatchCandidate>,
    pub best_match: Option<MatchCandidate>,
    pub total_found: usize,
    pub search_time_ms: f64,
}

impl MatchResult {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            matches: Vec::new(),
            best_match: None,
            total_found: 0,
            search_time_ms: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub query: String,
    pub brand: Option<String>,
    pub category: Option<String>,
}

/// Linear-scan fuzzy matcher over a [`CatalogIndex`] snapshot.
#[derive(Clone, Debug)]
pub struct ProductMatcher {
    catalog: Arc<CatalogIndex>,
}

impl ProductMatcher {
    pub fn new(catalog: Arc<CatalogIndex>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<CatalogIndex> {
        &self.catalog
    }

    /// Ranks catalog records against `query`. Hints that are not supplied are detected
    /// from the query text.
    pub fn match_products(
        &self,
        query: &str,
        brand: Option<&str>,
        category: Option<&str>,
        max_results: usize,
        min_score: f64,
    ) -> MatchResult {
        let started = Instant::now();
        let records = self.catalog.snapshot();
        if records.is_empty() {
            return MatchResult::empty(query);
        }

        let query_lower = query.trim().to_lowercase();
        let brand = brand.map(str::to_string).or_else(|| detect_brand(&query_lower).map(str::to_string));
        let category =
            category.map(str::to_string).or_else(|| detect_category(&query_lower).map(str::to_string));

        let mut scored = records
            .iter()
            .filter_map(|record| {
                let (score, reason) =
                    score_record(record, &query_lower, brand.as_deref(), category.as_deref());
                (score >= min_score).then_some((score, record, reason))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        let total_found = scored.len();
        let matches = scored
            .into_iter()
            .take(max_results)
            .map(|(score, record, reason)| MatchCandidate::from_record(record, score, reason))
            .collect::<Vec<_>>();
        let search_time_ms = started.elapsed().as_secs_f64() * 1_000.0;

        debug!(
            event_name = "catalog.match",
            query = %query,
            brand = brand.as_deref().unwrap_or(""),
            category = category.as_deref().unwrap_or(""),
            total_found,
            returned = matches.len(),
            "catalog scan complete"
        );

        MatchResult {
            query: query.to_string(),
            best_match: matches.first().cloned(),
            matches,
            total_found,
            search_time_ms,
        }
    }

    pub fn match_many(&self, queries: &[MatchQuery], max_results_per_query: usize) -> Vec<MatchResult> {
        queries
            .iter()
            .map(|query| {
                self.match_products(
                    &query.query,
                    query.brand.as_deref(),
                    query.category.as_deref(),
                    max_results_per_query,
                    DEFAULT_MIN_SCORE,
                )
            })
            .collect()
    }

    pub fn get_by_category(&self, category: &str, limit: usize) -> Vec<MatchCandidate> {
        let keywords = category_keywords(category);
        if keywords.is_empty() {
            return Vec::new();
        }

        self.catalog
            .snapshot()
            .iter()
            .filter(|record| {
                let name = record.display_name.to_lowercase();
                keywords.iter().any(|keyword| name.contains(keyword))
            })
            .take(limit)
            .map(|record| MatchCandidate::from_record(record, 1.0, format!("Category: {category}")))
            .collect()
    }

    pub fn get_by_brand(&self, brand: &str, limit: usize) -> Vec<MatchCandidate> {
        let brand_lower = brand.trim().to_lowercase();
        if brand_lower.is_empty() {
            return Vec::new();
        }

        self.catalog
            .snapshot()
            .iter()
            .filter(|record| record.display_name.to_lowercase().contains(&brand_lower))
            .take(limit)
            .map(|record| MatchCandidate::from_record(record, 1.0, format!("Brand: {brand}")))
            .collect()
    }

    pub fn get_by_id(&self, product_id: &ProductId) -> Option<MatchCandidate> {
        self.catalog
            .find(product_id)
            .map(|record| MatchCandidate::from_record(&record, 1.0, "Exact ID match"))
    }
}

fn score_record(
    record: &CatalogRecord,
    query_lower: &str,
    brand: Option<&str>,
    category: Option<&str>,
) -> (f64, String) {
    let raw_name = record.display_name.to_lowercase();
    let match_name = record.match_name().to_lowercase();
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let ratio = strsim::normalized_levenshtein(query_lower, &match_name);
    if ratio > NAME_RATIO_FLOOR {
        score += ratio * NAME_WEIGHT;
        reasons.push(format!("Name match: {ratio:.2}"));
    }

    let query_tokens = tokens(query_lower);
    let name_tokens = tokens(&match_name);
    let common = query_tokens.intersection(&name_tokens).count();
    if common > 0 {
        let overlap = common as f64 / query_tokens.len().max(1) as f64;
        score += overlap * TOKEN_WEIGHT;
        reasons.push(format!("Word match: {common} words"));
    }

    if let Some(brand) = brand {
        let brand_lower = brand.trim().to_lowercase();
        if !brand_lower.is_empty() && raw_name.contains(&brand_lower) {
            score += BRAND_BONUS;
            reasons.push(format!("Brand match: {brand}"));
        }
    }

    if let Some(category) = category {
        if category_keywords(category).iter().any(|keyword| raw_name.contains(keyword)) {
            score += CATEGORY_BONUS;
            reasons.push(format!("Category match: {category}"));
        }
    }

    let reason = if reasons.is_empty() { "No strong match".to_string() } else { reasons.join("; ") };
    (f64::min(score, 1.0), reason)
}

fn tokens(text: &str) -> BTreeSet<&str> {
    text.split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}
