/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag discovery and substitution.
//!
//! A tag is `<` followed by the shortest run of characters up to the next
//! `>`. Tags are kept verbatim (brackets included) in an insertion-ordered
//! [`TagSet`], so error messages list them in the order they were found.

use std::borrow::Cow;

use hashlink::LinkedHashSet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Insertion-ordered set of tag tokens such as `"<Title>"`.
pub type TagSet = LinkedHashSet<String>;

/// Matches a single `<tag>` token, non-greedy.
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").unwrap());

/// Collect every tag token occurring in `text`.
pub fn scan_tags(text: &str) -> TagSet {
    let mut tags = TagSet::new();
    scan_into(text, &mut tags);
    tags
}

/// Add every tag token occurring in `text` to `tags`.
pub fn scan_into(text: &str, tags: &mut TagSet) {
    for m in TAG_PATTERN.find_iter(text) {
        if !tags.contains(m.as_str()) {
            tags.insert(m.as_str().to_string());
        }
    }
}

/// Wrap a bare name in tag brackets: `Title` → `<Title>`.
pub fn tag_token(name: &str) -> String {
    format!("<{name}>")
}

/// Whether the trimmed text starts with the empty array sentinel `[]`.
pub fn is_empty_array(text: &str) -> bool {
    text.trim_start().starts_with("[]")
}

/// Replace tag tokens in a single pass.
///
/// `lookup` receives each token (brackets included) and returns its
/// replacement, or `None` to leave the token untouched. Replacement text is
/// never rescanned.
pub fn substitute<'t, F>(text: &'t str, mut lookup: F) -> Cow<'t, str>
where
    F: FnMut(&str) -> Option<String>,
{
    TAG_PATTERN.replace_all(text, |caps: &Captures| {
        let token = &caps[0];
        lookup(token).unwrap_or_else(|| token.to_string())
    })
}
