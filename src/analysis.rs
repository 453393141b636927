//! Text metrics derived from article titles and descriptions.
//!
//! Both functions are pure: phrase counting is case-insensitive, currency
//! detection is a literal, case-sensitive pattern match.

use once_cell::sync::Lazy;
use regex::Regex;

/// `$` amounts with optional thousands separators and cents, or a bare
/// integer followed by `dollars` / `USD`.
static MONEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\d+(?:,\d{3})*(?:\.\d{2})?|\d+ dollars|\d+ USD")
        .expect("money pattern is a valid regex")
});

/// Count non-overlapping, case-insensitive occurrences of `needle` in `haystack`.
///
/// An empty needle counts as zero matches.
pub fn count_occurrences(needle: &str, haystack: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let needle = needle.to_lowercase();
    haystack.to_lowercase().matches(needle.as_str()).count()
}

/// `true` if `text` mentions a dollar amount.
///
/// Examples that match: `$5`, `$1.50`, `$1,234.56`, `5 dollars`, `10 USD`.
/// A lowercase `usd` does not match.
pub fn contains_currency(text: &str) -> bool {
    MONEY_PATTERN.is_match(text)
}
