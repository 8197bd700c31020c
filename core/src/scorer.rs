use crate::idf::IdfTable;
use crate::index::{DocId, InvertedIndex};
use std::collections::HashMap;

/// Term -> occurrences in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCounts(HashMap<String, u32>);

impl QueryCounts {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counts = HashMap::new();
        for t in tokens {
            *counts.entry(t.into()).or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(t, c)| (t.as_str(), *c))
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// L2 norm of the IDF-weighted query vector, over terms present in `idf`.
    pub fn norm(&self, idf: &IdfTable) -> f64 {
        self.iter()
            .filter_map(|(term, count)| idf.get(term).map(|w| (count as f64 * w).powi(2)))
            .sum::<f64>()
            .sqrt()
    }
}

/// Term-at-a-time dot product between the query and every document sharing a surviving term with it.
///
/// Each posting `(doc, tf)` of a query term `w` seen `q` times adds `idf(w)^2 * q * tf`.
pub fn accumulate_dot_scores(query: &QueryCounts, index: &InvertedIndex, idf: &IdfTable) -> HashMap<DocId, f64> {
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for (term, q) in query.iter() {
        let Some(w) = idf.get(term) else { continue };
        let Some(plist) = index.postings(term) else { continue };
        let q_weight = w * w * q as f64;
        for p in plist {
            *scores.entry(p.doc_id).or_insert(0.0) += q_weight * p.tf as f64;
        }
    }
    scores
}
