//! Response similarity for duplicate detection.
//!
//! Two responses are considered duplicates when they are identical after
//! trimming and lowercasing, when one normalized form contains the other,
//! or when the Jaccard similarity of their word sets reaches the
//! configured threshold.

use std::collections::HashSet;

/// Lowercase and strip punctuation, keeping words and whitespace.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Jaccard similarity over lowercase, punctuation-stripped word sets.
///
/// Returns 0.0 when either side has no words.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a_norm = normalize(a);
    let b_norm = normalize(b);
    let words_a: HashSet<&str> = a_norm.split_whitespace().collect();
    let words_b: HashSet<&str> = b_norm.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Whether two responses are similar enough to be duplicates.
pub fn is_similar_response(a: &str, b: &str, threshold: f64) -> bool {
    let a_clean = a.trim().to_lowercase();
    let b_clean = b.trim().to_lowercase();

    if a_clean.is_empty() || b_clean.is_empty() {
        return false;
    }
    if a_clean == b_clean {
        return true;
    }
    // Partial duplicates: one response subsumes the other.
    if a_clean.contains(&b_clean) || b_clean.contains(&a_clean) {
        return true;
    }
    jaccard_similarity(a, b) >= threshold
}
