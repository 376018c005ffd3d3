//! Score normalisation, weighted fusion and ranking.
//!
//! Lexical scores are scaled by the best raw score of the query, semantic
//! cosines are mapped from `[-1, 1]` onto `[0, 1]`, and the two are mixed with
//! weights normalised to sum to one. A position scored by only one side gets
//! zero from the other.

/// Scale raw BM25 scores into `[0, 1]` by their maximum.
pub fn normalize_lexical(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(0.0_f64, f64::max);
    let divisor = if max > 0.0 { max } else { 1.0 };
    raw.iter().map(|s| (s / divisor).clamp(0.0, 1.0)).collect()
}

/// Map cosine similarities onto `[0, 1]` via `(cos + 1) / 2`.
pub fn normalize_semantic(raw: &[f64]) -> Vec<f64> {
    raw.iter().map(|c| (c.clamp(-1.0, 1.0) + 1.0) / 2.0).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f64,
    pub semantic: f64,
}

/// Normalise caller weights to sum to one.
///
/// Negative and non-finite weights count as zero; if nothing is left the
/// signals are mixed evenly.
pub fn normalize_weights(lexical: f64, semantic: f64) -> FusionWeights {
    let sanitize = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let (lexical, semantic) = (sanitize(lexical), sanitize(semantic));
    let total = lexical + semantic;
    if total > 0.0 {
        FusionWeights { lexical: lexical / total, semantic: semantic / total }
    } else {
        FusionWeights { lexical: 0.5, semantic: 0.5 }
    }
}

/// A fused score at a corpus position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub position: usize,
    pub score: f64,
}

/// Combine normalised scores over the union of scored positions, in position order.
pub fn fuse(lexical: &[f64], semantic: &[f64], weights: FusionWeights) -> Vec<Candidate> {
    let len = lexical.len().max(semantic.len());
    (0..len)
        .map(|position| {
            let lex = lexical.get(position).copied().unwrap_or(0.0);
            let sem = semantic.get(position).copied().unwrap_or(0.0);
            let score = (weights.lexical * lex + weights.semantic * sem).clamp(0.0, 1.0);
            Candidate { position, score }
        })
        .collect()
}

/// Threshold, filter, order best-first and truncate.
///
/// Sorting is stable, so equal scores keep corpus order.
pub fn rank(candidates: Vec<Candidate>, min_score: f64, keep: impl Fn(usize) -> bool, limit: usize) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.score >= min_score)
        .filter(|c| keep(c.position))
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}
