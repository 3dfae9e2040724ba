//! TF-IDF vectors over unigrams and bigrams with cosine similarity.
//!
//! Weights follow the common smoothed formulation: raw term counts times
//! `ln((1 + n) / (1 + df)) + 1`, rows L2-normalized. Terms present in more
//! than [`MAX_DOC_FREQ`] of the documents are pruned.

use super::text::{StopWords, tokens};
use std::collections::HashMap;

/// Maximum document frequency, as a proportion of the corpus.
pub const MAX_DOC_FREQ: f64 = 0.95;

type SparseVector = Vec<(usize, f64)>;

/// Stop words are removed before bigrams are formed.
fn terms(doc: &str, stop_words: &StopWords) -> Vec<String> {
    let words: Vec<&str> = tokens(doc, stop_words).collect();
    let mut out: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    out.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    out
}

/// All-pairs cosine similarity, or `None` when no term survives pruning.
pub fn tfidf_matrix(docs: &[String], stop_words: &StopWords) -> Option<Vec<Vec<f64>>> {
    let n = docs.len();
    let doc_terms: Vec<Vec<String>> = docs.iter().map(|d| terms(d, stop_words)).collect();

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for t in &doc_terms {
        let mut seen: Vec<&str> = t.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for term in seen {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let max_doc_count = MAX_DOC_FREQ * n as f64;
    let mut vocabulary: Vec<&str> =
        doc_freq.iter().filter(|(_, df)| **df as f64 <= max_doc_count).map(|(t, _)| *t).collect();
    if vocabulary.is_empty() {
        return None;
    }
    vocabulary.sort_unstable();
    let index: HashMap<&str, usize> = vocabulary.iter().enumerate().map(|(i, t)| (*t, i)).collect();

    let idf: Vec<f64> = vocabulary
        .iter()
        .map(|t| ((1.0 + n as f64) / (1.0 + doc_freq[t] as f64)).ln() + 1.0)
        .collect();

    let vectors: Vec<SparseVector> = doc_terms
        .iter()
        .map(|t| {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for term in t {
                if let Some(&i) = index.get(term.as_str()) {
                    *counts.entry(i).or_insert(0.0) += 1.0;
                }
            }
            let mut v: SparseVector = counts.into_iter().map(|(i, tf)| (i, tf * idf[i])).collect();
            v.sort_unstable_by_key(|(i, _)| *i);
            let norm = v.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, w) in &mut v {
                    *w /= norm;
                }
            }
            v
        })
        .collect();

    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let sim = dot(&vectors[i], &vectors[j]).clamp(0.0, 1.0);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    Some(matrix)
}

/// Dot product of two index-sorted sparse vectors.
fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
