//! Hashtag and mention extraction.
//!
//! A token is a sigil (`#` or `@`) followed by one or more token characters:
//! Unicode letters (`\p{L}`), Unicode numbers (`\p{N}`) and `_`. A sigil
//! opens a token wherever it appears, so `foo#bar` tags `bar` and `#a#b` tags
//! both `a` and `b`. Both extractors share this rule. Results are lowercased, deduplicated and
//! kept in first-occurrence order.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#([\p{L}\p{N}_]+)").expect("valid hashtag pattern")
});

static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@([\p{L}\p{N}_]+)").expect("valid mention pattern")
});

/// Distinct hashtags in `text`, without the `#`.
#[must_use]
pub fn extract_hashtags(text: &str) -> Vec<String> {
    extract(&HASHTAG_RE, text)
}

/// Distinct mentioned usernames in `text`, without the `@`.
#[must_use]
pub fn extract_mentions(text: &str) -> Vec<String> {
    extract(&MENTION_RE, text)
}

/// Normalize a user-typed hashtag (`#Rust`, `rust `) to its stored form.
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

/// What a span returned by [`token_spans`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Hashtag,
    Mention,
}

/// Byte ranges of every hashtag and mention in `text`, sigil included, in
/// text order. Duplicates are kept; this is for rendering, not indexing.
#[must_use]
pub fn token_spans(text: &str) -> Vec<(Range<usize>, TokenKind)> {
    let spans_of = |re: &Regex, kind: TokenKind| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            // Sigils are one byte.
            .map(move |m| (m.start() - 1..m.end(), kind))
            .collect::<Vec<_>>()
    };

    let mut spans = spans_of(&HASHTAG_RE, TokenKind::Hashtag);
    spans.extend(spans_of(&MENTION_RE, TokenKind::Mention));
    spans.sort_by_key(|(range, _)| range.start);
    spans
}

fn extract(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unique()
        .collect()
}
