//! Properties that must hold for every corpus, checked over generated corpora,
//! queries and prune settings. `ranking.rs` keeps the fixed boundary scenarios.

use folio_core::{
    build_index, compute_idf, compute_norms, search, tokenize, BoostSignals, DocId, FieldTokens, IdfTable,
    InvertedIndex,
};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

const FIELD: &str = "description";

/// Small vocabulary so terms repeat across documents and every prune path gets hit.
const VOCAB: &[&str] = &[
    "wizard", "dragon", "school", "magic", "village", "detective", "teacher", "mountain", "gold", "stars",
];

fn document_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCAB), 0..10).prop_map(|words| words.join(" "))
}

fn corpus_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(document_strategy(), 1..16)
}

/// Mostly in-vocabulary words, with the odd unknown one and some punctuation.
fn query_strategy() -> impl Strategy<Value = String> {
    let word = prop_oneof![
        4 => prop::sample::select(VOCAB).prop_map(str::to_string),
        1 => Just("zeppelin".to_string()),
        1 => Just("!!".to_string()),
    ];
    prop::collection::vec(word, 0..5).prop_map(|words| words.join(" "))
}

fn prune_strategy() -> impl Strategy<Value = (usize, f64)> {
    (1usize..5, 0.0f64..=1.0)
}

fn tokenized(texts: &[String]) -> Vec<FieldTokens> {
    texts.iter().map(|t| FieldTokens::from([(FIELD.to_string(), tokenize(t))])).collect()
}

fn build(texts: &[String], min_df: usize, max_df_ratio: f64) -> (InvertedIndex, IdfTable) {
    let index = build_index(&tokenized(texts), FIELD);
    let idf = compute_idf(&index, texts.len(), min_df, max_df_ratio);
    (index, idf)
}

/// Cosine over dense vectors spanning the surviving vocabulary. Documents with a zero dot product are left out.
fn dense_cosines(texts: &[String], idf: &IdfTable, query: &str) -> HashMap<DocId, f64> {
    let vocab: BTreeSet<&str> = idf.iter().map(|(t, _)| t).collect();
    let weigh = |tokens: &[String]| -> Vec<f64> {
        vocab
            .iter()
            .map(|term| tokens.iter().filter(|t| t == term).count() as f64 * idf.get(term).unwrap_or(0.0))
            .collect()
    };
    let q = weigh(&tokenize(query));
    let q_len = q.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mut out = HashMap::new();
    for (doc_id, text) in texts.iter().enumerate() {
        let d = weigh(&tokenize(text));
        let dot: f64 = q.iter().zip(&d).map(|(a, b)| a * b).sum();
        if dot != 0.0 {
            let d_len = d.iter().map(|x| x * x).sum::<f64>().sqrt();
            out.insert(doc_id as DocId, dot / (q_len * d_len));
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Postings are strictly ascending by doc id, in range, and count every occurrence.
    #[test]
    fn prop_postings_sorted_and_unique(corpus in corpus_strategy()) {
        let n = corpus.len();
        let index = build_index(&tokenized(&corpus), FIELD);
        prop_assert_eq!(index.num_docs as usize, n);
        prop_assert!(index.validate().is_ok());

        let mut tf_per_doc = vec![0u32; n];
        for (term, plist) in index.terms() {
            prop_assert!(!plist.is_empty(), "empty postings for {}", term);
            for w in plist.windows(2) {
                prop_assert!(w[0].doc_id < w[1].doc_id, "postings for {} out of order", term);
            }
            for p in plist {
                prop_assert!((p.doc_id as usize) < n);
                prop_assert!(p.tf > 0);
                tf_per_doc[p.doc_id as usize] += p.tf;
            }
        }
        for (doc_id, text) in corpus.iter().enumerate() {
            prop_assert_eq!(tf_per_doc[doc_id] as usize, tokenize(text).len());
        }
    }

    /// A term is in the IDF table iff it meets both prune bounds, and its weight is the clamped log2 formula.
    #[test]
    fn prop_idf_respects_prune_bounds(corpus in corpus_strategy(), (min_df, ratio) in prune_strategy()) {
        let n = corpus.len();
        let (index, idf) = build(&corpus, min_df, ratio);
        for (term, plist) in index.terms() {
            let df = plist.len();
            let kept = df >= min_df && df as f64 / n as f64 <= ratio;
            prop_assert_eq!(idf.contains(term), kept, "term {} df {}", term, df);
        }
        for (term, w) in idf.iter() {
            let df = index.doc_freq(term);
            prop_assert!(df >= min_df);
            prop_assert!(df as f64 / n as f64 <= ratio);
            prop_assert!(w >= 0.0);
            let want = (n as f64 / (1.0 + df as f64)).log2().max(0.0);
            prop_assert!((w - want).abs() < 1e-12, "term {} weight {} want {}", term, w, want);
        }
    }

    /// One norm per document, never negative, and zero exactly when no surviving term has positive weight.
    #[test]
    fn prop_norms_non_negative(corpus in corpus_strategy(), (min_df, ratio) in prune_strategy()) {
        let (index, idf) = build(&corpus, min_df, ratio);
        let norms = compute_norms(&index, &idf, corpus.len());
        prop_assert_eq!(norms.len(), corpus.len());
        for (doc_id, text) in corpus.iter().enumerate() {
            let norm = norms.get(doc_id as DocId).unwrap();
            prop_assert!(norm.is_finite() && norm >= 0.0);
            let weighted = tokenize(text).iter().any(|t| idf.get(t).unwrap_or(0.0) > 0.0);
            prop_assert_eq!(norm > 0.0, weighted, "doc {}", doc_id);
        }
    }

    /// Term-at-a-time scoring agrees with dense cosine; any extra hit scores exactly 0.
    #[test]
    fn prop_sparse_cosine_matches_dense(
        corpus in corpus_strategy(),
        query in query_strategy(),
        (min_df, ratio) in prune_strategy(),
    ) {
        let n = corpus.len();
        let (index, idf) = build(&corpus, min_df, ratio);
        let norms = compute_norms(&index, &idf, n);
        let results = search(&query, &index, &idf, &norms, &BoostSignals::neutral(n)).unwrap();
        let sparse: HashMap<DocId, f64> = results.iter().map(|r| (r.doc_id, r.score)).collect();
        prop_assert_eq!(sparse.len(), results.len(), "duplicate doc ids in results");

        let dense = dense_cosines(&corpus, &idf, &query);
        for (doc, want) in &dense {
            let got = sparse.get(doc).copied().unwrap_or(f64::NAN);
            prop_assert!((got - want).abs() < 1e-9, "doc {}: sparse {} dense {}", doc, got, want);
        }
        for (doc, got) in &sparse {
            if !dense.contains_key(doc) {
                prop_assert_eq!(*got, 0.0, "doc {}", doc);
            }
        }
        for w in results.windows(2) {
            prop_assert!(w[0].score > w[1].score || (w[0].score == w[1].score && w[0].doc_id < w[1].doc_id));
        }
    }
}
