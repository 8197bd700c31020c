//! Cosine ranking with a popularity boost.
//!
//! Raw dot products from [`accumulate_dot_scores`] are divided by the product
//! of query and document norms, then multiplied by `1 + rating * thumbs`.

use crate::error::{Error, Result};
use crate::idf::IdfTable;
use crate::index::{DocId, InvertedIndex};
use crate::norms::DocNorms;
use crate::scorer::{accumulate_dot_scores, QueryCounts};
use crate::tokenizer::Analyzer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// How many results the book search page shows.
pub const DEFAULT_TOP_N: usize = 21;

/// Per-document boost inputs, indexed by doc id. Both columns are non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostSignals {
    pub rating: Vec<f64>,
    pub thumbs: Vec<f64>,
}

impl BoostSignals {
    /// All zeros: every document gets a boost factor of exactly 1.
    pub fn neutral(n_docs: usize) -> Self {
        Self { rating: vec![0.0; n_docs], thumbs: vec![0.0; n_docs] }
    }

    /// Dense signals from sparse maps; ids missing from a map default to 0.
    pub fn from_sparse(n_docs: usize, rating: &HashMap<DocId, f64>, thumbs: &HashMap<DocId, f64>) -> Self {
        let dense = |m: &HashMap<DocId, f64>| -> Vec<f64> {
            (0..n_docs as DocId).map(|id| m.get(&id).copied().unwrap_or(0.0)).collect()
        };
        Self { rating: dense(rating), thumbs: dense(thumbs) }
    }

    /// Scale each raw column into `[0, 1]` by its maximum. A column with no positive value becomes all zeros.
    pub fn normalized_by_max(raw_rating: &[f64], raw_thumbs: &[f64]) -> Self {
        Self { rating: scale_by_max(raw_rating), thumbs: scale_by_max(raw_thumbs) }
    }

    pub fn len(&self) -> usize { self.rating.len() }

    pub fn is_empty(&self) -> bool { self.rating.is_empty() }

    fn factor(&self, doc_id: DocId) -> f64 {
        let i = doc_id as usize;
        1.0 + self.rating[i] * self.thumbs[i]
    }

    /// Both columns must have `n_docs` entries, each finite and non-negative.
    pub fn validate(&self, n_docs: usize) -> Result<()> {
        for (what, col) in [("rating", &self.rating), ("thumbs", &self.thumbs)] {
            if col.len() != n_docs {
                return Err(Error::LengthMismatch { what, expected: n_docs, got: col.len() });
            }
            if let Some((i, v)) = col.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
                return Err(Error::InvalidSignal { what, doc_id: i as DocId, value: *v });
            }
        }
        Ok(())
    }
}

fn scale_by_max(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().filter(|v| v.is_finite()).fold(0.0f64, f64::max);
    raw.iter()
        .map(|v| if max > 0.0 && v.is_finite() && *v > 0.0 { v / max } else { 0.0 })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub score: f64,
    pub doc_id: DocId,
}

/// Rank every document that shares a surviving term with `query`, best first.
///
/// Ties on score are broken by ascending doc id. An out-of-vocabulary or empty
/// query gives an empty list.
pub fn search(
    query: &str,
    index: &InvertedIndex,
    idf: &IdfTable,
    norms: &DocNorms,
    signals: &BoostSignals,
) -> Result<Vec<ScoredDoc>> {
    search_with(&Analyzer::default(), query, index, idf, norms, signals)
}

/// [`search`] with the analyzer the index was built with.
pub fn search_with(
    analyzer: &Analyzer,
    query: &str,
    index: &InvertedIndex,
    idf: &IdfTable,
    norms: &DocNorms,
    signals: &BoostSignals,
) -> Result<Vec<ScoredDoc>> {
    let n_docs = index.num_docs as usize;
    if norms.len() != n_docs {
        return Err(Error::LengthMismatch { what: "doc norms", expected: n_docs, got: norms.len() });
    }
    signals.validate(n_docs)?;

    let query = QueryCounts::from_tokens(analyzer.analyze(query));
    let raw = accumulate_dot_scores(&query, index, idf);
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let q_norm = query.norm(idf);

    let mut results: Vec<ScoredDoc> = raw
        .into_iter()
        .map(|(doc_id, dot)| {
            let denom = q_norm * norms.get(doc_id).unwrap_or(0.0);
            let cosine = if denom > 0.0 { dot / denom } else { 0.0 };
            ScoredDoc { score: cosine * signals.factor(doc_id), doc_id }
        })
        .collect();
    sort_results(&mut results);
    Ok(results)
}

/// Descending by score, then ascending by doc id.
pub fn sort_results(results: &mut [ScoredDoc]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
}

pub fn top_n(mut results: Vec<ScoredDoc>, n: usize) -> Vec<ScoredDoc> {
    results.truncate(n);
    results
}
