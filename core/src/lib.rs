//! Small-corpus full-text search: per-field inverted indexes, pruned IDF
//! weights, precomputed document norms and cosine ranking with a popularity
//! boost.

pub mod error;
pub mod features;
pub mod idf;
pub mod index;
pub mod norms;
pub mod persist;
pub mod rank;
pub mod scorer;
pub mod snapshot;
pub mod tokenizer;

pub use error::{Error, Result};
pub use features::{extract_features, Document, FieldTokens};
pub use idf::{compute_idf, IdfTable, PruneConfig};
pub use index::{build_index, DocId, InvertedIndex, Posting};
pub use norms::{compute_norms, DocNorms};
pub use rank::{search, top_n, BoostSignals, ScoredDoc, DEFAULT_TOP_N};
pub use scorer::{accumulate_dot_scores, QueryCounts};
pub use snapshot::{DocMeta, FieldIndex, IndexConfig, Snapshot, SnapshotHandle};
pub use tokenizer::{tokenize, Analyzer};
