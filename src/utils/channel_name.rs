//! Channel name canonicalization
//!
//! Sources spell the same channel many ways: `CCTV-01`, `cctv1`, `CCTV 1`,
//! `CCTV1 ★`. Matching happens on the canonical form produced here, both
//! when source records are merged and when template entries are looked up.
//!
//! The canonical form is built in order:
//! 1. drop every character that is not a word character, whitespace, `-`,
//!    `+` or `&`
//! 2. upper-case
//! 3. collapse whitespace runs to one space and trim
//! 4. remove separators (`-`, `_`, whitespace) between a letter and a digit
//! 5. rewrite each ASCII digit run in minimal decimal form (`05` becomes `5`)
//!
//! The function is idempotent.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s+&-]").expect("disallowed character class is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static LETTER_SEPARATOR_DIGIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\p{L})[\s_-]+([0-9])").expect("letter/digit separator pattern is valid")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"));

/// Canonicalize a raw channel name for cross-source matching
///
/// ```rust
/// use m3u_aggregator::utils::normalize_channel_name;
///
/// assert_eq!(normalize_channel_name("CCTV-05"), "CCTV5");
/// assert_eq!(normalize_channel_name("cctv 1 综合"), "CCTV1 综合");
/// ```
pub fn normalize_channel_name(raw: &str) -> String {
    let kept = DISALLOWED.replace_all(raw, "");
    let upper = kept.to_uppercase();
    let collapsed = WHITESPACE.replace_all(upper.trim(), " ");
    let joined = LETTER_SEPARATOR_DIGIT.replace_all(&collapsed, "${1}${2}");

    DIGIT_RUN
        .replace_all(&joined, |caps: &regex::Captures| {
            let digits = caps[0].trim_start_matches('0');
            if digits.is_empty() {
                "0".to_string()
            } else {
                digits.to_string()
            }
        })
        .into_owned()
}
