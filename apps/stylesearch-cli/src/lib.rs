//! Product file loading for `stylesearch ingest`.
//!
//! `*.jsonl` files hold one product object per line; `*.json` files hold a
//! single object or an array of objects. Each product's record id is its
//! `product_id`, else its `id`, else `<file stem>-<n>`.
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use stylesearch_core::types::{field_text, CatalogRecord, Payload};

/// Product files under `dir`, sorted by path.
pub fn product_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("json" | "jsonl")))
        .collect();
    files.sort();
    files
}

#[derive(Debug, Default)]
pub struct LoadedFile {
    pub records: Vec<CatalogRecord>,
    /// Entries that were not JSON objects or did not parse.
    pub rejected: usize,
}

pub fn load_file(path: &Path) -> Result<LoadedFile> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("product");
    let mut loaded = LoadedFile::default();

    let values: Vec<Value> = if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
        let mut values = Vec::new();
        for (n, line) in text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<Value>(line) {
                Ok(v) => values.push(v),
                Err(e) => {
                    warn!(file = %path.display(), line = n + 1, error = %e, "skipping malformed line");
                    loaded.rejected += 1;
                }
            }
        }
        values
    } else {
        match serde_json::from_str::<Value>(&text).with_context(|| format!("parsing {}", path.display()))? {
            Value::Array(items) => items,
            other => vec![other],
        }
    };

    for (n, value) in values.into_iter().enumerate() {
        match value {
            Value::Object(payload) => loaded.records.push(to_record(stem, n, payload)),
            _ => loaded.rejected += 1,
        }
    }
    Ok(loaded)
}

fn to_record(stem: &str, n: usize, payload: Payload) -> CatalogRecord {
    let id = field_text(&payload, "product_id")
        .or_else(|| field_text(&payload, "id"))
        .unwrap_or_else(|| format!("{stem}-{n}"));
    CatalogRecord::new(id, payload)
}
