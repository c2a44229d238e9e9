//! Composite string similarity used by every fuzzy path.
//!
//! Blends edit distance, word-set overlap, and a substring heuristic into
//! a single [0, 1] score. Both inputs are expected to be canonicalized by
//! the caller; all lengths are measured in characters, not bytes, since
//! Hebrew is multi-byte in UTF-8.

use std::collections::HashSet;

const LEVENSHTEIN_WEIGHT: f64 = 0.4;
const JACCARD_WEIGHT: f64 = 0.4;
const SUBSTRING_WEIGHT: f64 = 0.2;

/// Substring component when one string contains the other verbatim.
const CONTAINMENT_SCORE: f64 = 0.8;

/// Composite similarity in [0, 1]. Symmetric; 1.0 for identical non-empty
/// strings; 0 when either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    // The weighted blend tops out at 0.96 for identical strings (the
    // substring component caps at 0.8), so identity is guarded explicitly.
    if a == b {
        return 1.0;
    }
    LEVENSHTEIN_WEIGHT * levenshtein_sim(a, b)
        + JACCARD_WEIGHT * jaccard_sim(a, b)
        + SUBSTRING_WEIGHT * substring_score(a, b)
}

/// `1 - edit_distance / max(len)`, classic unit-cost edit distance.
fn levenshtein_sim(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - strsim::levenshtein(a, b) as f64 / max_len as f64
}

/// Word-set overlap: `|A ∩ B| / |A ∪ B|` over whitespace-split words.
fn jaccard_sim(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Containment beats everything; otherwise the longest common substring
/// relative to the longer string.
fn substring_score(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let (shorter, longer) = if len_a <= len_b { (a, b) } else { (b, a) };
    if longer.contains(shorter) {
        return CONTAINMENT_SCORE;
    }
    longest_common_substring(a, b) as f64 / len_a.max(len_b) as f64
}

/// Length in characters of the longest common substring, standard DP with
/// a rolling row.
fn longest_common_substring(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best = 0;

    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            best = best.max(curr[j + 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}
