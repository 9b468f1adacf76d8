//! Small shared helpers
//!
//! - [`find_similar`] - "did you mean" suggestions for unknown ids and parameters
//! - [`camelize`] - turn event names into listener method names
//! - [`compute_checksum`] - `sha256:<hex>` digests of dumped containers

use regex::Regex;
use std::sync::OnceLock;
use strsim::levenshtein;

use crate::constants::SUGGESTION_MAX_DISTANCE;

/// Find candidates close to `target`, closest first.
///
/// A candidate qualifies when its Levenshtein distance is small or when it contains
/// `target` as a substring.
pub fn find_similar<'a>(target: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(String, usize)> = candidates
        .into_iter()
        .filter(|candidate| *candidate != target)
        .filter_map(|candidate| {
            let distance = levenshtein(target, candidate);
            (distance <= SUGGESTION_MAX_DISTANCE || candidate.contains(target))
                .then(|| (candidate.to_string(), distance))
        })
        .collect();

    scored.sort_by(|(a_name, a_dist), (b_name, b_dist)| a_dist.cmp(b_dist).then(a_name.cmp(b_name)));
    scored.into_iter().take(5).map(|(name, _)| name).collect()
}

fn word_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("static regex"))
}

/// `kernel.request` becomes `KernelRequest`; every non-alphanumeric run splits words.
pub fn camelize(name: &str) -> String {
    word_separator()
        .split(name)
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}

/// SHA-256 digest of `content` in `sha256:<hex>` form.
pub fn compute_checksum(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
