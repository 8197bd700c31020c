//! Immutable search snapshots.
//!
//! A [`Snapshot`] bundles, for each indexed field, the inverted index, its IDF
//! table and document norms, together with the boost signals and display
//! metadata of the corpus it was built from. It is never mutated after
//! [`Snapshot::build`]; a corpus change means building a new one and handing
//! it to [`SnapshotHandle::swap`].

use crate::error::{Error, Result};
use crate::features::{extract_features, Document, FieldTokens, BOOK_FIELDS};
use crate::idf::{compute_idf, IdfTable, PruneConfig};
use crate::index::{build_index, DocId, InvertedIndex};
use crate::norms::{compute_norms, DocNorms};
use crate::rank::{search_with, BoostSignals, ScoredDoc};
use crate::tokenizer::Analyzer;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default)]
    pub prune: PruneConfig,
    #[serde(default)]
    pub analyzer: Analyzer,
}
fn default_fields() -> Vec<String> { BOOK_FIELDS.iter().map(|f| f.to_string()).collect() }

impl Default for IndexConfig {
    fn default() -> Self {
        Self { fields: default_fields(), prune: PruneConfig::default(), analyzer: Analyzer::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIndex {
    pub index: InvertedIndex,
    pub idf: IdfTable,
    pub norms: DocNorms,
}

impl FieldIndex {
    pub fn build(documents: &[FieldTokens], field: &str, prune: &PruneConfig) -> Self {
        let n_docs = documents.len();
        let index = build_index(documents, field);
        let idf = compute_idf(&index, n_docs, prune.min_df, prune.max_df_ratio);
        let norms = compute_norms(&index, &idf, n_docs);
        Self { index, idf, norms }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: IndexConfig,
    docs: Vec<DocMeta>,
    fields: BTreeMap<String, FieldIndex>,
    signals: BoostSignals,
}

impl Snapshot {
    /// Build every configured field index over `documents`, numbering them by position.
    pub fn build(documents: &[Document], signals: BoostSignals, config: IndexConfig) -> Result<Self> {
        let n_docs = documents.len();
        signals.validate(n_docs)?;

        let features: Vec<FieldTokens> = documents
            .iter()
            .map(|d| extract_features(d, config.fields.as_slice(), &config.analyzer))
            .collect();
        let fields: BTreeMap<String, FieldIndex> = config
            .fields
            .iter()
            .map(|f| (f.clone(), FieldIndex::build(&features, f, &config.prune)))
            .collect();
        let docs = documents
            .iter()
            .map(|d| DocMeta { external_id: d.external_id.clone(), title: d.title.clone() })
            .collect();

        for (name, fi) in &fields {
            tracing::info!(field = %name, num_terms = fi.index.num_terms(), scored_terms = fi.idf.len(), "indexed field");
        }
        tracing::info!(num_docs = n_docs, num_fields = fields.len(), "snapshot built");
        Ok(Self { config, docs, fields, signals })
    }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.docs.get(doc_id as usize)
    }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn signals(&self) -> &BoostSignals { &self.signals }

    /// Ranked hits for `query` against one field, best first.
    pub fn search(&self, field: &str, query: &str) -> Result<Vec<ScoredDoc>> {
        let fi = self.field(field).ok_or_else(|| Error::UnknownField(field.to_string()))?;
        search_with(&self.config.analyzer, query, &fi.index, &fi.idf, &fi.norms, &self.signals)
    }

    /// Re-check the invariants `build` guarantees. Used on snapshots decoded from bytes.
    pub fn validate(&self) -> Result<()> {
        let n_docs = self.docs.len();
        self.signals.validate(n_docs)?;
        for (name, fi) in &self.fields {
            if fi.index.field != *name {
                return Err(Error::Validation(format!("field {name:?} holds index of {:?}", fi.index.field)));
            }
            if fi.index.num_docs as usize != n_docs {
                return Err(Error::LengthMismatch { what: "index doc count", expected: n_docs, got: fi.index.num_docs as usize });
            }
            if fi.norms.len() != n_docs {
                return Err(Error::LengthMismatch { what: "doc norms", expected: n_docs, got: fi.norms.len() });
            }
            fi.index.validate()?;
            if let Some((term, w)) = fi.idf.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
                return Err(Error::Validation(format!("idf of {term:?} is {w}")));
            }
        }
        Ok(())
    }
}

/// The snapshot queries currently read. Readers clone the `Arc` and never block each other for long;
/// a rebuild publishes a whole new snapshot with [`SnapshotHandle::swap`].
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Publish `next` and return the snapshot it replaced.
    pub fn swap(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        let prev = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(num_docs = self.load().num_docs(), "snapshot swapped");
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{AUTHORS, CATEGORIES, DESCRIPTION, PUBLISHER};

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("b0").with_title("Dune")
                .with_field(CATEGORIES, "Fiction").with_field(AUTHORS, "Frank Herbert")
                .with_field(PUBLISHER, "Chilton").with_field(DESCRIPTION, "Desert planet spice politics"),
            Document::new("b1").with_title("Emma")
                .with_field(CATEGORIES, "Fiction").with_field(AUTHORS, "Jane Austen")
                .with_field(DESCRIPTION, "Matchmaking in a quiet village"),
            Document::new("b2").with_title("Cosmos")
                .with_field(CATEGORIES, "Science").with_field(AUTHORS, "Carl Sagan")
                .with_field(PUBLISHER, "Random House").with_field(DESCRIPTION, "The planet and the stars"),
            Document::new("b3").with_title("Persuasion")
                .with_field(CATEGORIES, "Fiction").with_field(AUTHORS, "Jane Austen")
                .with_field(DESCRIPTION, "A second chance at love"),
        ]
    }

    fn loose() -> IndexConfig {
        IndexConfig { prune: PruneConfig { min_df: 1, max_df_ratio: 1.0 }, ..IndexConfig::default() }
    }

    #[test]
    fn builds_every_configured_field() {
        let snap = Snapshot::build(&corpus(), BoostSignals::neutral(4), loose()).unwrap();
        assert_eq!(snap.num_docs(), 4);
        let names: Vec<&str> = snap.field_names().collect();
        assert_eq!(names, vec![AUTHORS, CATEGORIES, DESCRIPTION, PUBLISHER]);
        assert_eq!(snap.doc(2).unwrap().title, "Cosmos");
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn searches_by_field() {
        let snap = Snapshot::build(&corpus(), BoostSignals::neutral(4), loose()).unwrap();
        let hits = snap.search(AUTHORS, "austen").unwrap();
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![1, 3]);
        let hits = snap.search(DESCRIPTION, "planet").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(snap.search(PUBLISHER, "austen").unwrap().is_empty());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let snap = Snapshot::build(&corpus(), BoostSignals::neutral(4), loose()).unwrap();
        assert!(matches!(snap.search("isbn", "x"), Err(Error::UnknownField(f)) if f == "isbn"));
    }

    #[test]
    fn rejects_signals_of_wrong_length() {
        let err = Snapshot::build(&corpus(), BoostSignals::neutral(3), loose()).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 4, got: 3, .. }));
    }

    #[test]
    fn empty_corpus_searches_to_nothing() {
        let snap = Snapshot::build(&[], BoostSignals::default(), IndexConfig::default()).unwrap();
        assert_eq!(snap.num_docs(), 0);
        assert!(snap.search(DESCRIPTION, "anything").unwrap().is_empty());
    }

    #[test]
    fn handle_swaps_without_touching_old_readers() {
        let handle = SnapshotHandle::new(Snapshot::build(&corpus(), BoostSignals::neutral(4), loose()).unwrap());
        let before = handle.load();
        let smaller = Snapshot::build(&corpus()[..2], BoostSignals::neutral(2), loose()).unwrap();
        let prev = handle.swap(smaller);
        assert!(Arc::ptr_eq(&before, &prev));
        assert_eq!(before.num_docs(), 4);
        assert_eq!(handle.load().num_docs(), 2);
        assert_eq!(before.search(AUTHORS, "austen").unwrap().len(), 2);
    }
}
