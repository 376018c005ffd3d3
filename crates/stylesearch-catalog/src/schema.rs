use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const PRODUCT_ID: &str = "product_id";
pub const PAYLOAD: &str = "payload";
pub const INGESTED_AT: &str = "ingested_at";

pub fn build_catalog_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(PRODUCT_ID, DataType::Utf8, false),
        Field::new(PAYLOAD, DataType::Utf8, false),
        Field::new(INGESTED_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}
