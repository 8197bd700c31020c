use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[A-Za-z]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Tokenize text into lowercase runs of ASCII letters. Everything else separates tokens and is dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text).map(|m| m.as_str().to_ascii_lowercase()).collect()
}

/// Optional analysis layered over [`tokenize`]. The default analyzer does nothing extra.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    /// Reduce each token to its English Snowball stem.
    #[serde(default)]
    pub stem: bool,
    /// Decompose (NFKD) and strip combining marks first, so "café" yields "cafe".
    #[serde(default)]
    pub fold_diacritics: bool,
}

impl Analyzer {
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let mut tokens = if self.fold_diacritics {
            let folded: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
            tokenize(&folded)
        } else {
            tokenize(text)
        };
        if self.stem {
            for t in tokens.iter_mut() {
                *t = STEMMER.stem(t.as_str()).into_owned();
            }
        }
        tokens
    }
}
