//! `@name` tag extraction.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const MAX_TAGS_PER_COMMENT: usize = 20;

// `@` must start the text or follow a non-word character, so "bob@mail.com" is not a tag.
fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| {
        Regex::new(r"(?:^|[^A-Za-z0-9_@])@([A-Za-z0-9_]{3,32})\b").expect("Invalid tag regex")
    })
}

/// Returns the tagged names without the `@`, deduplicated case-insensitively
/// in order of first appearance.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tag_regex()
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.to_ascii_lowercase()))
        .take(MAX_TAGS_PER_COMMENT)
        .collect()
}
