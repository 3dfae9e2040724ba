//! Jaccard similarity over stop-word-filtered token sets.

use super::text::{StopWords, tokens};
use std::collections::HashSet;

/// All-pairs Jaccard similarity of normalized documents.
///
/// The diagonal is `1.0`; two documents with no tokens at all score `0.0`.
pub fn jaccard_matrix(docs: &[String], stop_words: &StopWords) -> Vec<Vec<f64>> {
    let sets: Vec<HashSet<&str>> = docs.iter().map(|d| tokens(d, stop_words).collect()).collect();
    let n = sets.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let union = sets[i].union(&sets[j]).count();
            let sim = if union == 0 {
                0.0
            } else {
                sets[i].intersection(&sets[j]).count() as f64 / union as f64
            };
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}
