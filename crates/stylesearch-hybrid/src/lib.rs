//! Hybrid lexical + semantic product search.
//!
//! [`HybridSearchEngine`] owns the published [`IndexSnapshot`] and its
//! lifecycle. Searches read whatever snapshot is current without locking;
//! builds run one at a time and publish with a single pointer swap, so a
//! reader sees either the old or the new snapshot in full.
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

use stylesearch_core::config::SearchSettings;
use stylesearch_core::error::{Error, Result};
use stylesearch_core::traits::{CatalogStore, Embedder, SearchEngine};
use stylesearch_core::types::{BuildReport, ProductInfo, RankedResult, SearchRequest};
use stylesearch_vector::SemanticIndex;

pub mod explain;
pub mod fusion;
pub mod snapshot;

pub use explain::explain;
pub use snapshot::{IndexSnapshot, IndexedEntry};

use fusion::{fuse, normalize_lexical, normalize_semantic, normalize_weights, rank};

/// Lifecycle state reported by [`HybridSearchEngine::status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub built: bool,
    pub documents: usize,
    pub skipped: usize,
}

pub struct HybridSearchEngine {
    catalog: Arc<dyn CatalogStore>,
    semantic: SemanticIndex,
    settings: SearchSettings,
    snapshot: ArcSwapOption<IndexSnapshot>,
    build_lock: Mutex<()>,
}

impl HybridSearchEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_settings(catalog, embedder, SearchSettings::default())
    }

    pub fn with_settings(catalog: Arc<dyn CatalogStore>, embedder: Arc<dyn Embedder>, settings: SearchSettings) -> Self {
        Self {
            catalog,
            semantic: SemanticIndex::new(embedder),
            settings,
            snapshot: ArcSwapOption::empty(),
            build_lock: Mutex::new(()),
        }
    }

    pub fn status(&self) -> IndexStatus {
        match self.snapshot.load_full() {
            Some(s) => IndexStatus { built: true, documents: s.len(), skipped: s.skipped() },
            None => IndexStatus::default(),
        }
    }

    /// Rebuild from the current catalog and publish the result.
    ///
    /// On error the previously published snapshot stays in place.
    pub fn refresh(&self) -> Result<BuildReport> {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_, report) = self.rebuild()?;
        Ok(report)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<RankedResult>> {
        let query = request.query.trim();
        if query.is_empty() { return Ok(Vec::new()); }

        let snapshot = self.current_or_build()?;
        if snapshot.is_empty() { return Ok(Vec::new()); }

        let (lexical, semantic) = thread::scope(|s| {
            let lexical = s.spawn(|| snapshot.lexical_scores(query));
            let semantic = s.spawn(|| self.semantic.encode(query).map(|q| snapshot.semantic_scores(&q)));
            (lexical.join(), semantic.join())
        });
        let Some((lexical, semantic)) = surviving_scores(lexical, semantic) else { return Ok(Vec::new()) };

        let lexical = normalize_lexical(&lexical);
        let semantic = normalize_semantic(&semantic);
        let weights = normalize_weights(request.lexical_weight, request.semantic_weight);
        let candidates = fuse(&lexical, &semantic, weights);

        let category = request.category.as_deref();
        let keep = |position: usize| match category {
            Some(wanted) => snapshot.entry(position).and_then(|e| e.category.as_deref()) == Some(wanted),
            None => true,
        };
        let ranked = rank(candidates, request.min_score, keep, self.effective_limit(request.limit));

        let results: Vec<RankedResult> = ranked
            .into_iter()
            .filter_map(|c| snapshot.entry(c.position).map(|entry| (entry, c.score)))
            .map(|(entry, score)| {
                let product_info = ProductInfo::from_payload(&entry.product_id, &entry.payload);
                let (match_reasoning, key_similarities) = explain(&entry.payload, &request.query, score);
                RankedResult {
                    product_id: product_info.product_id.clone(),
                    similarity_score: score,
                    product_info,
                    match_reasoning,
                    key_similarities,
                }
            })
            .collect();
        debug!(query, results = results.len(), "search complete");
        Ok(results)
    }

    fn effective_limit(&self, limit: usize) -> usize {
        if limit == 0 || limit > self.settings.max_limit { self.settings.default_limit } else { limit }
    }

    fn current_or_build(&self) -> Result<Arc<IndexSnapshot>> {
        if let Some(snapshot) = self.snapshot.load_full() { return Ok(snapshot); }
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished a build while we waited.
        if let Some(snapshot) = self.snapshot.load_full() { return Ok(snapshot); }
        info!("no index snapshot yet; building on first search");
        let (snapshot, _) = self.rebuild()?;
        Ok(snapshot)
    }

    /// Caller must hold `build_lock`.
    fn rebuild(&self) -> Result<(Arc<IndexSnapshot>, BuildReport)> {
        let records = self
            .catalog
            .scroll(self.settings.scroll_limit)
            .map_err(|e| Error::Catalog(format!("{e:#}")))?;
        let (snapshot, report) = IndexSnapshot::build(&records, &self.semantic)?;
        let snapshot = Arc::new(snapshot);
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        info!(scanned = report.scanned, indexed = report.indexed, skipped = report.failures.len(), "published index snapshot");
        Ok((snapshot, report))
    }
}

/// Raw scores from the two scorer threads. A side that panicked or failed
/// is logged and comes back empty, so fusion treats it as 0 everywhere.
/// `None` when neither side produced scores.
fn surviving_scores(
    lexical: thread::Result<Vec<f64>>,
    semantic: thread::Result<Result<Vec<f64>>>,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let lexical = match lexical {
        Ok(scores) => Some(scores),
        Err(_) => { warn!("lexical scorer panicked; ranking on semantic scores only"); None }
    };
    let semantic = match semantic {
        Ok(Ok(scores)) => Some(scores),
        Ok(Err(e)) => { warn!(error = %e, "semantic scoring failed; ranking on lexical scores only"); None }
        Err(_) => { warn!("semantic scorer panicked; ranking on lexical scores only"); None }
    };
    if lexical.is_none() && semantic.is_none() { return None; }
    Some((lexical.unwrap_or_default(), semantic.unwrap_or_default()))
}

impl SearchEngine for HybridSearchEngine {
    fn search(&self, request: &SearchRequest) -> Result<Vec<RankedResult>> { Self::search(self, request) }
    fn refresh(&self) -> Result<BuildReport> { Self::refresh(self) }
}
