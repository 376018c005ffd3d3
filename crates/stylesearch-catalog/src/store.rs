use anyhow::{anyhow, Context, Result};
use arrow_array::{Array, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use std::collections::HashMap;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use stylesearch_core::traits::CatalogStore;
use stylesearch_core::types::{CatalogRecord, Payload};

use crate::schema::{PAYLOAD, PRODUCT_ID};
use crate::table::{open_catalog_table, open_db, upsert_records};

/// Rows written per merge-insert call during [`LanceCatalog::upsert`].
const WRITE_BATCH: usize = 1000;

pub struct LanceCatalog {
    rt: Runtime,
    table: Table,
    name: String,
}

impl LanceCatalog {
    /// Connect to `uri` and open (creating if needed) the catalog table `name`.
    pub fn open(uri: &str, name: &str) -> Result<Self> {
        let rt = Runtime::new()?;
        let table = rt.block_on(async {
            let conn = open_db(uri).await?;
            open_catalog_table(&conn, name).await
        }).with_context(|| format!("opening catalog table '{name}' at {uri}"))?;
        info!(uri, table = name, "opened catalog");
        Ok(Self { rt, table, name: name.to_string() })
    }

    /// Insert or replace products by id. Returns the number of distinct ids written.
    pub fn upsert(&self, records: &[CatalogRecord]) -> Result<usize> {
        let deduped = dedup_last_wins(records);
        for chunk in deduped.chunks(WRITE_BATCH) {
            self.rt.block_on(upsert_records(&self.table, chunk))?;
        }
        info!(table = %self.name, written = deduped.len(), "upserted catalog records");
        Ok(deduped.len())
    }
}

impl CatalogStore for LanceCatalog {
    fn scroll(&self, limit: usize) -> Result<Vec<CatalogRecord>> {
        if limit == 0 { return Ok(Vec::new()); }
        self.rt.block_on(async {
            let mut stream = self.table.query().limit(limit).execute().await?;
            let mut out = Vec::new();
            while let Some(batch) = stream.try_next().await? {
                let ids = string_column(&batch, PRODUCT_ID)?;
                let payloads = string_column(&batch, PAYLOAD)?;
                for i in 0..batch.num_rows() {
                    let id = ids.value(i);
                    match serde_json::from_str::<Payload>(payloads.value(i)) {
                        Ok(payload) => out.push(CatalogRecord::new(id, payload)),
                        Err(e) => warn!(product_id = id, error = %e, "skipping catalog row with malformed payload"),
                    }
                }
            }
            debug!(table = %self.name, rows = out.len(), "scrolled catalog");
            Ok::<_, anyhow::Error>(out)
        })
    }

    fn count(&self) -> Result<usize> {
        Ok(self.rt.block_on(self.table.count_rows(None))?)
    }
}

fn string_column<'a>(batch: &'a arrow_array::RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("catalog column '{name}' missing or not utf8"))
}

/// Keep the last record per id, at the position of its first occurrence.
fn dedup_last_wins(records: &[CatalogRecord]) -> Vec<CatalogRecord> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<CatalogRecord> = Vec::with_capacity(records.len());
    for record in records {
        match slot.get(record.id.as_str()) {
            Some(&i) => out[i] = record.clone(),
            None => {
                slot.insert(record.id.as_str(), out.len());
                out.push(record.clone());
            }
        }
    }
    out
}
