//! stylesearch-text
//!
//! Lexical side of the hybrid search: the query/document tokenizer and a
//! BM25 ranker, built on the `bm25` crate, that scores every document of a
//! corpus.
pub mod bm25;
pub mod tokenize;

pub use self::bm25::{Bm25Index, Bm25Params, ProductTokenizer};
pub use tokenize::tokenize;
