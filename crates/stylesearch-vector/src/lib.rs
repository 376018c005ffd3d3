//! Semantic (dense vector) scoring for the hybrid search.
pub mod semantic;

pub use semantic::{cosine_scores, l2_normalize, SemanticIndex, ENCODE_BATCH};
