//! UK postcode normalization and format checks.

use regex::Regex;
use std::sync::OnceLock;

fn postcode_regex() -> &'static Regex {
    static POSTCODE: OnceLock<Regex> = OnceLock::new();
    POSTCODE.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z]{1,2}\d[A-Z\d]? ?\d[A-Z]{2}$").expect("postcode pattern is valid")
    })
}

/// Trim and upper-case; this is also the cache key for lookups
pub fn normalize(postcode: &str) -> String {
    postcode.trim().to_uppercase()
}

/// Whether an already-normalized string looks like a UK postcode
pub fn is_valid(normalized: &str) -> bool {
    postcode_regex().is_match(normalized)
}
