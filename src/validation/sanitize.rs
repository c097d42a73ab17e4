// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTML sanitizing for user-supplied rich text.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

const ALLOWED_TAGS: &[&str] = &["b", "i", "em", "strong", "br", "p"];

static SANITIZER: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    let mut builder = ammonia::Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(["script", "style"].into_iter().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::new())
        .link_rel(None);
    builder
});

/// Strip everything except a small set of formatting tags. Attributes are
/// always removed; `<script>` and `<style>` are dropped with their content.
pub fn sanitize_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    SANITIZER.clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_removed_with_content() {
        assert_eq!(
            sanitize_html("<script>x</script><b>ok</b>"),
            "<b>ok</b>"
        );
    }

    #[test]
    fn test_attributes_stripped() {
        assert_eq!(
            sanitize_html(r#"<p onclick="evil()" class="x">hi</p>"#),
            "<p>hi</p>"
        );
    }

    #[test]
    fn test_disallowed_tags_keep_text() {
        assert_eq!(
            sanitize_html(r#"<a href="https://example.com">link</a> <em>yes</em>"#),
            "link <em>yes</em>"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_html(""), "");
    }
}
