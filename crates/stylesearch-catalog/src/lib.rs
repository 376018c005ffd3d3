//! LanceDB-backed product catalog.
//!
//! Products live in a single table of `(product_id, payload, ingested_at)`
//! rows where `payload` is the product's JSON object. [`LanceCatalog`] owns a
//! tokio runtime so callers stay synchronous.
pub mod schema;
pub mod store;
pub mod table;

pub use store::LanceCatalog;
