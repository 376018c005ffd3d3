//! Immutable index snapshot.
//!
//! A snapshot is one arena of [`IndexedEntry`] values plus the BM25 index
//! built from the same entries' text, so lexical and semantic scores are
//! always addressed by the same positions. Snapshots are never mutated once
//! built; a rebuild produces a new one.

use tracing::{debug, info, warn};

use stylesearch_core::error::{Error, Result};
use stylesearch_core::types::{BuildReport, CatalogRecord, EntryFailure, Payload, ProductDocument, ProductId};
use stylesearch_text::Bm25Index;
use stylesearch_vector::{cosine_scores, SemanticIndex};

#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub product_id: ProductId,
    /// Lowercased searchable text: what was embedded and BM25-indexed.
    pub searchable_text: String,
    /// Unit-length embedding of `searchable_text`.
    pub embedding: Vec<f32>,
    pub category: Option<String>,
    pub payload: Payload,
}

#[derive(Debug, Default)]
pub struct IndexSnapshot {
    entries: Vec<IndexedEntry>,
    lexical: Bm25Index,
    skipped: usize,
}

impl IndexSnapshot {
    /// Build a snapshot from a full catalog enumeration.
    ///
    /// Documents that fail to embed are left out and listed in the report.
    /// When every document of a non-empty corpus fails, the embedder is
    /// considered down and the build fails as a whole.
    pub fn build(records: &[CatalogRecord], semantic: &SemanticIndex) -> Result<(Self, BuildReport)> {
        info!(records = records.len(), "building index snapshot");
        let docs: Vec<ProductDocument> = records.iter().map(ProductDocument::from_record).collect();
        let searchable: Vec<String> = docs.iter().map(|d| d.searchable_text().to_lowercase()).collect();
        let embeddings = semantic.encode_corpus(&searchable);

        let mut entries = Vec::with_capacity(docs.len());
        let mut failures = Vec::new();
        for ((doc, searchable_text), embedding) in docs.into_iter().zip(searchable).zip(embeddings) {
            match embedding {
                Ok(embedding) => entries.push(IndexedEntry {
                    product_id: doc.product_id,
                    searchable_text,
                    embedding,
                    category: doc.category,
                    payload: doc.metadata,
                }),
                Err(e) => {
                    warn!(product_id = %doc.product_id, error = %e, "skipping document");
                    failures.push(EntryFailure { product_id: doc.product_id, reason: e.to_string() });
                }
            }
        }

        if entries.is_empty() && !failures.is_empty() {
            let first = &failures[0];
            return Err(Error::Embedding(format!(
                "all {} documents failed to embed (first: {}: {})",
                failures.len(),
                first.product_id,
                first.reason
            )));
        }

        let texts: Vec<&str> = entries.iter().map(|e| e.searchable_text.as_str()).collect();
        let lexical = Bm25Index::build(&texts);
        let report = BuildReport { scanned: records.len(), indexed: entries.len(), failures };
        info!(indexed = report.indexed, skipped = report.failures.len(), "index snapshot built");
        Ok((Self { entries, lexical, skipped: report.failures.len() }, report))
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Documents left out of this snapshot by its build.
    pub fn skipped(&self) -> usize { self.skipped }

    pub fn entry(&self, position: usize) -> Option<&IndexedEntry> { self.entries.get(position) }

    pub fn entries(&self) -> &[IndexedEntry] { &self.entries }

    /// Raw BM25 score per position; empty when the query has no tokens.
    pub fn lexical_scores(&self, query: &str) -> Vec<f64> {
        let scores = self.lexical.score(query);
        debug!(scored = scores.len(), "lexical scoring");
        scores
    }

    /// Raw cosine similarity per position for a unit-length query vector.
    pub fn semantic_scores(&self, query: &[f32]) -> Vec<f64> {
        cosine_scores(query, self.entries.iter().map(|e| e.embedding.as_slice()))
    }
}
