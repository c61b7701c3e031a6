//! Key-set similarity used to deduplicate patterns and preferences.
//!
//! Records are compared only by the keys of their payload maps, never by
//! deep structural equality.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Merge threshold for success and project patterns.
pub const PATTERN_THRESHOLD: f64 = 0.8;

/// Merge threshold for user preferences.
pub const PREFERENCE_THRESHOLD: f64 = 0.7;

/// Fraction of a stored context that must agree with a query context.
pub const CONTEXT_THRESHOLD: f64 = 0.6;

/// Jaccard similarity `|A ∩ B| / |A ∪ B|` of two key sets.
///
/// Returns 0.0 when either set is empty.
pub fn jaccard(a: &Map<String, Value>, b: &Map<String, Value>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let keys_a: BTreeSet<&str> = a.keys().map(String::as_str).collect();
    let keys_b: BTreeSet<&str> = b.keys().map(String::as_str).collect();

    let intersection = keys_a.intersection(&keys_b).count();
    let union = keys_a.union(&keys_b).count();

    intersection as f64 / union as f64
}

/// Whether two payloads count as the same record at `threshold`.
pub fn is_similar(a: &Map<String, Value>, b: &Map<String, Value>, threshold: f64) -> bool {
    jaccard(a, b) >= threshold
}

/// Whether a stored pattern context applies to the current context.
///
/// Empty contexts match everything. Otherwise the share of stored keys
/// whose value is equal in `current` must reach [`CONTEXT_THRESHOLD`].
pub fn context_matches(stored: &Map<String, Value>, current: &Map<String, Value>) -> bool {
    if stored.is_empty() || current.is_empty() {
        return true;
    }

    let agreeing = stored
        .iter()
        .filter(|(key, value)| current.get(key.as_str()) == Some(value))
        .count();

    agreeing as f64 / stored.len() as f64 >= CONTEXT_THRESHOLD
}
