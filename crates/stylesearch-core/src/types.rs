//! Domain types shared by the catalog, indexing and search crates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ProductId = String;

/// Open, string-keyed product metadata as stored in the catalog.
pub type Payload = serde_json::Map<String, Value>;

/// One product as enumerated from a [`crate::traits::CatalogStore`].
///
/// `id` is the store's own record key; the payload may carry a separate
/// `product_id` which takes precedence for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: ProductId,
    pub payload: Payload,
}

impl CatalogRecord {
    pub fn new(id: impl Into<ProductId>, payload: Payload) -> Self {
        Self { id: id.into(), payload }
    }
}

/// Typed view over the searchable fields of a catalog payload.
///
/// Missing or empty fields are `None`/empty. `metadata` keeps the full raw
/// payload for response shaping and the secondary searchable keys.
#[derive(Debug, Clone, Default)]
pub struct ProductDocument {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub colors: Vec<String>,
    pub style_tags: Vec<String>,
    pub description: Option<String>,
    pub metadata: Payload,
}

impl ProductDocument {
    pub fn from_record(record: &CatalogRecord) -> Self {
        let payload = &record.payload;
        Self {
            product_id: record.id.clone(),
            name: field_text(payload, "name"),
            brand: field_text(payload, "brand"),
            category: field_text(payload, "category"),
            subcategory: field_text(payload, "subcategory"),
            colors: field_list(payload, "colors"),
            style_tags: field_list(payload, "style_tags"),
            description: field_text(payload, "description"),
            metadata: payload.clone(),
        }
    }
}

/// Render a payload value as searchable text.
///
/// Strings are taken verbatim, numbers and `true` via their display form,
/// arrays as their renderable elements joined by spaces. Null, `false`,
/// objects and empty strings/arrays render as nothing.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            if parts.is_empty() { None } else { Some(parts.join(" ")) }
        }
        _ => None,
    }
}

pub fn field_text(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(value_text)
}

/// List-valued field; non-array values are ignored.
pub fn field_list(payload: &Payload, key: &str) -> Vec<String> {
    match payload.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        _ => Vec::new(),
    }
}

/// Display fields returned with every ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub price: f64,
    pub currency: String,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

impl ProductInfo {
    pub const DEFAULT_CURRENCY: &'static str = "INR";

    /// Shape display info from a raw payload, falling back to `record_id`
    /// when the payload has no `product_id` of its own.
    pub fn from_payload(record_id: &str, payload: &Payload) -> Self {
        Self {
            product_id: field_text(payload, "product_id").unwrap_or_else(|| record_id.to_string()),
            name: field_text(payload, "name").unwrap_or_else(|| "Unknown".to_string()),
            brand: field_text(payload, "brand"),
            price: payload.get("price").and_then(Value::as_f64).unwrap_or(0.0),
            currency: field_text(payload, "currency").unwrap_or_else(|| Self::DEFAULT_CURRENCY.to_string()),
            image_url: field_text(payload, "image_url"),
            in_stock: payload.get("in_stock").and_then(Value::as_bool).unwrap_or(true),
        }
    }
}

/// A single hit of the hybrid search, best first in the returned list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub product_id: ProductId,
    /// Fused score in `[0, 1]`.
    pub similarity_score: f64,
    pub product_info: ProductInfo,
    pub match_reasoning: String,
    pub key_similarities: Vec<String>,
}

/// Parameters of one hybrid search call.
///
/// Weights need not sum to one; the engine normalises them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    pub category: Option<String>,
    pub min_score: f64,
}

impl SearchRequest {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const DEFAULT_LEXICAL_WEIGHT: f64 = 0.4;
    pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.6;
    pub const DEFAULT_MIN_SCORE: f64 = 0.3;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: Self::DEFAULT_LIMIT,
            lexical_weight: Self::DEFAULT_LEXICAL_WEIGHT,
            semantic_weight: Self::DEFAULT_SEMANTIC_WEIGHT,
            category: None,
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self { self.limit = limit; self }

    #[must_use]
    pub fn with_weights(mut self, lexical: f64, semantic: f64) -> Self {
        self.lexical_weight = lexical;
        self.semantic_weight = semantic;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self { self.category = Some(category.into()); self }

    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self { self.min_score = min_score; self }
}

/// A document that could not be indexed during a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub product_id: ProductId,
    pub reason: String,
}

/// Outcome of a successful index build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Records returned by the catalog scroll.
    pub scanned: usize,
    /// Entries that made it into the published snapshot.
    pub indexed: usize,
    pub failures: Vec<EntryFailure>,
}
