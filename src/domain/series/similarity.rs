// Trigram similarity with the same semantics as PostgreSQL's pg_trgm:
// lowercase, split on non-alphanumerics, pad each word with two leading and
// one trailing blank, compare trigram sets by Jaccard index.

use std::collections::HashSet;

/// Storage key for case-insensitive equality
pub fn normalize_series_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn trigrams(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let mut set = HashSet::new();

    for word in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = format!("  {} ", word).chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }

    set
}

/// Similarity in [0.0, 1.0]; 0.0 when either side has no trigrams
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;

    shared as f64 / union as f64
}
