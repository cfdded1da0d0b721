//! The slug module holds the one naming rule shared by route generation and
//! the detail-page lookup: names become URL segments by lower-casing and
//! hyphenating whitespace, and segments resolve back to names by swapping
//! hyphens for spaces and comparing case-insensitively.
//!
//! The transform is deliberately naive. Punctuation such as `/`, `?` or `#`
//! passes through untouched, and a name that already contains a hyphen does
//! not survive the reverse trip.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::WHITESPACE_RUN;

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(WHITESPACE_RUN).expect("Failed to compile WHITESPACE_RUN regex"));

/// Derives the URL segment for an entity display name.
///
/// `"GPT Writer"` becomes `"gpt-writer"`, `"AI   Tool"` becomes `"ai-tool"`.
pub fn to_slug(name: &str) -> String {
    WHITESPACE_REGEX
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// Turns a URL segment back into the name pattern detail pages search for.
pub fn from_slug(slug: &str) -> String {
    slug.replace('-', " ")
}

/// Returns `true` when `slug` resolves to `name` under the lookup rule.
pub fn matches_slug(name: &str, slug: &str) -> bool {
    name.to_lowercase() == from_slug(slug).to_lowercase()
}
