use crate::types::{BuildReport, CatalogRecord, RankedResult, SearchRequest};

/// Text embedding capability. Vectors have a fixed dimensionality `dim()`
/// across calls.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Product catalog enumeration used for index building.
pub trait CatalogStore: Send + Sync {
    /// Up to `limit` records in a stable enumeration order.
    fn scroll(&self, limit: usize) -> anyhow::Result<Vec<CatalogRecord>>;
    fn count(&self) -> anyhow::Result<usize>;
}

pub trait SearchEngine: Send + Sync {
    fn search(&self, request: &SearchRequest) -> crate::error::Result<Vec<RankedResult>>;
    fn refresh(&self) -> crate::error::Result<BuildReport>;
}
