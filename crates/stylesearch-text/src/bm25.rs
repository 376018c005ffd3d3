//! Okapi BM25 over a position-addressed corpus, backed by the
//! [`bm25`](https://crates.io/crates/bm25) crate.
//!
//! Documents and queries go through [`tokenize`], so the ranker sees the
//! same tokens as the rest of the search. The crate's scorer uses the
//! non-negative `idf = ln(1 + (N - df + 0.5) / (df + 0.5))`, so raw scores
//! are unbounded but never negative. Scores are raw: normalisation belongs
//! to the caller.

use bm25::{Embedder, EmbedderBuilder, Scorer, Tokenizer};
use std::fmt;
use tracing::debug;

use crate::tokenize::tokenize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

/// Adapter so the crate tokenizes with [`tokenize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductTokenizer;

impl Tokenizer for ProductTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> { tokenize(input_text) }
}

struct Ranker {
    embedder: Embedder<u32, ProductTokenizer>,
    scorer: Scorer<usize, u32>,
}

#[derive(Default)]
pub struct Bm25Index {
    params: Bm25Params,
    docs: usize,
    /// `None` for an empty corpus.
    ranker: Option<Ranker>,
}

impl fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bm25Index").field("params", &self.params).field("docs", &self.docs).finish_non_exhaustive()
    }
}

impl Bm25Index {
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Self { Self::with_params(corpus, Bm25Params::default()) }

    pub fn with_params<S: AsRef<str>>(corpus: &[S], params: Bm25Params) -> Self {
        if corpus.is_empty() {
            return Self { params, docs: 0, ranker: None };
        }
        let texts: Vec<&str> = corpus.iter().map(AsRef::as_ref).collect();
        let embedder = EmbedderBuilder::<u32, ProductTokenizer>::with_tokenizer_and_fit_to_corpus(ProductTokenizer, &texts)
            .k1(params.k1)
            .b(params.b)
            .build();
        let mut scorer = Scorer::<usize, u32>::new();
        for (position, text) in texts.iter().enumerate() {
            scorer.upsert(&position, embedder.embed(text));
        }
        debug!(docs = texts.len(), k1 = params.k1, b = params.b, "built bm25 index");
        Self { params, docs: texts.len(), ranker: Some(Ranker { embedder, scorer }) }
    }

    pub fn len(&self) -> usize { self.docs }

    pub fn is_empty(&self) -> bool { self.docs == 0 }

    /// Raw score for every corpus position, in corpus order.
    ///
    /// Returns an empty vector when the corpus or the tokenized query is
    /// empty. Positions the scorer has nothing for count as 0.
    pub fn score(&self, query: &str) -> Vec<f64> {
        let Some(ranker) = &self.ranker else { return Vec::new() };
        let terms = tokenize(query);
        if terms.is_empty() { return Vec::new(); }

        // One embedding per query token so repeated terms accumulate.
        let term_embeddings: Vec<_> = terms.iter().map(|term| ranker.embedder.embed(term)).collect();
        (0..self.docs)
            .map(|position| {
                term_embeddings
                    .iter()
                    .map(|term| f64::from(ranker.scorer.score(&position, term).unwrap_or(0.0)))
                    .sum()
            })
            .collect()
    }
}
