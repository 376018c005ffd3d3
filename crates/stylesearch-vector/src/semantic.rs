use std::sync::Arc;
use tracing::{debug, warn};

use stylesearch_core::error::{Error, Result};
use stylesearch_core::traits::Embedder;

/// Texts sent to the embedder per call while encoding a corpus.
pub const ENCODE_BATCH: usize = 64;

/// Dense side of the hybrid search.
///
/// Wraps the injected [`Embedder`]; every vector it hands out is validated
/// against the embedder's dimensionality and L2-normalised, so scoring is a
/// plain dot product.
#[derive(Clone)]
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self { Self { embedder } }

    pub fn dim(&self) -> usize { self.embedder.dim() }

    /// Encode a single text (the query path).
    pub fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let raw = self.embedder.embed_text(text).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        self.finish(raw)
    }

    /// Encode a whole corpus, one result per input text in input order.
    ///
    /// Texts go to the embedder in batches of [`ENCODE_BATCH`]. When a batch
    /// call fails, its texts are retried one at a time so a single bad
    /// document only costs its own entry.
    pub fn encode_corpus(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(ENCODE_BATCH).enumerate() {
            match self.embedder.embed_batch(batch) {
                Ok(vectors) if vectors.len() == batch.len() => {
                    out.extend(vectors.into_iter().map(|v| self.finish(v)));
                }
                Ok(vectors) => {
                    warn!(batch = batch_no, expected = batch.len(), got = vectors.len(), "embedder returned a short batch; retrying per document");
                    out.extend(batch.iter().map(|t| self.encode(t)));
                }
                Err(e) => {
                    warn!(batch = batch_no, error = %e, "batch embedding failed; retrying per document");
                    out.extend(batch.iter().map(|t| self.encode(t)));
                }
            }
        }
        debug!(texts = texts.len(), "encoded corpus");
        out
    }

    fn finish(&self, mut v: Vec<f32>) -> Result<Vec<f32>> {
        let expected = self.dim();
        if v.len() != expected { return Err(Error::DimensionMismatch { expected, actual: v.len() }); }
        if v.iter().any(|x| !x.is_finite()) { return Err(Error::Embedding("non-finite component in embedding".to_string())); }
        l2_normalize(&mut v);
        Ok(v)
    }
}

/// Scale `v` to unit length in place; the zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() { *x = (f64::from(*x) / norm) as f32; }
    }
}

/// Cosine similarity of `query` against each corpus vector, in corpus order.
///
/// Both sides must already be L2-normalised. Results are clamped to
/// `[-1, 1]`; an empty corpus gives an empty vector.
pub fn cosine_scores<'a>(query: &[f32], corpus: impl IntoIterator<Item = &'a [f32]>) -> Vec<f64> {
    corpus
        .into_iter()
        .map(|doc| {
            let dot: f64 = doc.iter().zip(query).map(|(a, b)| f64::from(*a) * f64::from(*b)).sum();
            dot.clamp(-1.0, 1.0)
        })
        .collect()
}
