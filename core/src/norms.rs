use crate::idf::IdfTable;
use crate::index::{DocId, InvertedIndex};
use serde::{Deserialize, Serialize};

/// Euclidean length of each document's IDF-weighted term-frequency vector, indexed by doc id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocNorms(Vec<f64>);

impl DocNorms {
    pub fn get(&self, doc_id: DocId) -> Option<f64> {
        self.0.get(doc_id as usize).copied()
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn as_slice(&self) -> &[f64] { &self.0 }
}

impl From<Vec<f64>> for DocNorms {
    fn from(v: Vec<f64>) -> Self { Self(v) }
}

/// Accumulate `(tf * idf)^2` per document over every term that survived pruning, then take square roots.
/// Documents without a surviving term keep norm 0. `n_docs` must be `index.num_docs`.
pub fn compute_norms(index: &InvertedIndex, idf: &IdfTable, n_docs: usize) -> DocNorms {
    debug_assert_eq!(n_docs, index.num_docs as usize, "n_docs does not match the index");
    let mut norms = vec![0.0f64; n_docs];
    for (term, plist) in index.terms() {
        let Some(w) = idf.get(term) else { continue };
        for p in plist {
            if let Some(acc) = norms.get_mut(p.doc_id as usize) {
                let x = p.tf as f64 * w;
                *acc += x * x;
            }
        }
    }
    for n in norms.iter_mut() {
        *n = n.sqrt();
    }
    DocNorms(norms)
}
