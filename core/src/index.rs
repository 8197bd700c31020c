use crate::error::{Error, Result};
use crate::features::FieldTokens;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Occurrences of the term in this document's field.
    pub tf: u32,
}

/// Term -> postings for one text field. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub field: String,
    pub num_docs: u32,
    postings: HashMap<String, Vec<Posting>>, // postings sorted by doc_id
}

impl InvertedIndex {
    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    /// Number of distinct documents containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    /// Check that every postings list is non-empty, strictly ascending by doc id and in `[0, num_docs)`.
    pub fn validate(&self) -> Result<()> {
        for (term, plist) in &self.postings {
            if plist.is_empty() {
                return Err(Error::Validation(format!("term {term:?} has no postings")));
            }
            if let Some(w) = plist.windows(2).find(|w| w[0].doc_id >= w[1].doc_id) {
                return Err(Error::Validation(format!(
                    "postings for {term:?} not strictly ascending: {} then {}",
                    w[0].doc_id, w[1].doc_id
                )));
            }
            let last = plist[plist.len() - 1].doc_id;
            if last >= self.num_docs {
                return Err(Error::Validation(format!(
                    "postings for {term:?} reference doc {last}, corpus has {} docs",
                    self.num_docs
                )));
            }
        }
        Ok(())
    }
}

/// Build the inverted index of `field` over documents numbered by their position.
///
/// Documents are visited in id order, so each postings list is sorted as it grows.
pub fn build_index(documents: &[FieldTokens], field: &str) -> InvertedIndex {
    let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
    let mut total_tokens = 0usize;
    for (doc_id, feats) in documents.iter().enumerate() {
        let Some(tokens) = feats.get(field) else { continue };
        total_tokens += tokens.len();
        let mut tf_counts: HashMap<&str, u32> = HashMap::new();
        for token in tokens {
            *tf_counts.entry(token.as_str()).or_insert(0) += 1;
        }
        for (term, tf) in tf_counts {
            postings
                .entry(term.to_string())
                .or_default()
                .push(Posting { doc_id: doc_id as DocId, tf });
        }
    }
    tracing::debug!(field, num_docs = documents.len(), num_terms = postings.len(), total_tokens, "built inverted index");
    InvertedIndex { field: field.to_string(), num_docs: documents.len() as u32, postings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(field: &str, texts: &[&str]) -> Vec<FieldTokens> {
        texts
            .iter()
            .map(|t| {
                let mut m = FieldTokens::new();
                m.insert(field.to_string(), crate::tokenizer::tokenize(t));
                m
            })
            .collect()
    }

    #[test]
    fn counts_term_frequency_per_doc() {
        let idx = build_index(&docs("authors", &["to be or not to be", "do be do be do"]), "authors");
        assert_eq!(idx.postings("be").unwrap(), &[Posting { doc_id: 0, tf: 2 }, Posting { doc_id: 1, tf: 2 }]);
        assert_eq!(idx.postings("not").unwrap(), &[Posting { doc_id: 0, tf: 1 }]);
        assert_eq!(idx.postings("do").unwrap(), &[Posting { doc_id: 1, tf: 3 }]);
        assert_eq!(idx.num_docs, 2);
        assert!(idx.validate().is_ok());
    }

    #[test]
    fn other_fields_are_ignored() {
        let idx = build_index(&docs("publisher", &["tor books"]), "authors");
        assert_eq!(idx.num_terms(), 0);
        assert_eq!(idx.num_docs, 1);
        assert_eq!(idx.doc_freq("tor"), 0);
    }

    #[test]
    fn empty_corpus() {
        let idx = build_index(&[], "description");
        assert_eq!(idx.num_docs, 0);
        assert_eq!(idx.num_terms(), 0);
    }

    #[test]
    fn validate_rejects_unsorted_and_out_of_range() {
        let mut idx = build_index(&docs("f", &["a b", "a"]), "f");
        idx.postings.get_mut("a").unwrap().reverse();
        assert!(matches!(idx.validate(), Err(Error::Validation(_))));

        let mut idx = build_index(&docs("f", &["a"]), "f");
        idx.num_docs = 0;
        assert!(matches!(idx.validate(), Err(Error::Validation(_))));

        let mut idx = build_index(&docs("f", &["a a"]), "f");
        idx.postings.get_mut("a").unwrap().push(Posting { doc_id: 0, tf: 1 });
        assert!(matches!(idx.validate(), Err(Error::Validation(_))));
    }
}
