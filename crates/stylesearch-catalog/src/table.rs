//! LanceDB connection and table helpers.
use anyhow::Result;
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_schema::Schema;
use chrono::Utc;
use lancedb::{connect, Connection, Table};
use std::sync::Arc;
use tracing::info;

use stylesearch_core::types::CatalogRecord;

use crate::schema::build_catalog_schema;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<Schema>) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.iter().any(|n| n == name) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await?;
    info!(table = name, "created catalog table");
    Ok(())
}

pub async fn open_catalog_table(conn: &Connection, name: &str) -> Result<Table> {
    ensure_table(conn, name, build_catalog_schema()).await?;
    Ok(conn.open_table(name).execute().await?)
}

/// One record batch for `records`, stamped with the current time.
pub fn records_to_batch(records: &[CatalogRecord]) -> Result<RecordBatch> {
    let now = Utc::now().timestamp_millis();
    let mut ids = Vec::with_capacity(records.len());
    let mut payloads = Vec::with_capacity(records.len());
    for record in records {
        ids.push(record.id.clone());
        payloads.push(serde_json::to_string(&record.payload)?);
    }
    let batch = RecordBatch::try_new(
        build_catalog_schema(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(payloads)),
            Arc::new(TimestampMillisecondArray::from(vec![now; records.len()])),
        ],
    )?;
    Ok(batch)
}

/// Merge `records` into the table keyed on `product_id`.
pub async fn upsert_records(table: &Table, records: &[CatalogRecord]) -> Result<()> {
    if records.is_empty() { return Ok(()); }
    let batch = records_to_batch(records)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), build_catalog_schema()));
    let mut mi = table.merge_insert(&[crate::schema::PRODUCT_ID]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await?;
    Ok(())
}
