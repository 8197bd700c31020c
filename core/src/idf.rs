use crate::index::InvertedIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Document-frequency pruning bounds, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PruneConfig {
    #[serde(default = "default_min_df")]
    pub min_df: usize,
    #[serde(default = "default_max_df_ratio")]
    pub max_df_ratio: f64,
}
fn default_min_df() -> usize { 5 }
fn default_max_df_ratio() -> f64 { 0.95 }

impl Default for PruneConfig {
    fn default() -> Self {
        Self { min_df: default_min_df(), max_df_ratio: default_max_df_ratio() }
    }
}

/// Term -> IDF weight. A term absent from the table contributes nothing to any score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdfTable(HashMap<String, f64>);

impl IdfTable {
    pub fn get(&self, term: &str) -> Option<f64> {
        self.0.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains_key(term)
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(t, w)| (t.as_str(), *w))
    }
}

impl FromIterator<(String, f64)> for IdfTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `idf(t) = log2(n_docs / (1 + df))` for every term with `df >= min_df` and
/// `df / n_docs <= max_df_ratio`. Other terms are left out of the table.
///
/// A term found in every document would get a negative weight; it is clamped to 0.
/// `n_docs` must be `index.num_docs`.
pub fn compute_idf(index: &InvertedIndex, n_docs: usize, min_df: usize, max_df_ratio: f64) -> IdfTable {
    debug_assert_eq!(n_docs, index.num_docs as usize, "n_docs does not match the index");
    let n = n_docs as f64;
    let mut pruned = 0usize;
    let table: IdfTable = index
        .terms()
        .filter_map(|(term, plist)| {
            let df = plist.len();
            if df >= min_df && df as f64 / n <= max_df_ratio {
                Some((term.to_string(), (n / (1.0 + df as f64)).log2().max(0.0)))
            } else {
                pruned += 1;
                None
            }
        })
        .collect();
    tracing::debug!(field = %index.field, kept = table.len(), pruned, "computed idf");
    table
}
