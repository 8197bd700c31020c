use crate::tokenizer::Analyzer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const CATEGORIES: &str = "categories";
pub const AUTHORS: &str = "authors";
pub const PUBLISHER: &str = "publisher";
pub const DESCRIPTION: &str = "description";

/// The text fields a book record carries.
pub const BOOK_FIELDS: [&str; 4] = [CATEGORIES, AUTHORS, PUBLISHER, DESCRIPTION];

/// A document as handed over by the document source. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub external_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self { external_id: external_id.into(), ..Self::default() }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Field name -> token sequence for one document.
pub type FieldTokens = HashMap<String, Vec<String>>;

/// Tokenize the requested fields of a document. Absent fields map to an empty sequence.
///
/// Multi-valued fields such as a comma-joined author list are tokenized as one blob.
pub fn extract_features<S: AsRef<str>>(doc: &Document, fields: &[S], analyzer: &Analyzer) -> FieldTokens {
    fields
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let tokens = doc.field(name).map(|text| analyzer.analyze(text)).unwrap_or_default();
            (name.to_string(), tokens)
        })
        .collect()
}
