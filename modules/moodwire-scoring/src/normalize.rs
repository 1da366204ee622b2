use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>]+").unwrap());
static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s,.!?]").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Prepare text for scoring: decode HTML entities, strip markup tags, strip
/// URLs, collapse non-word punctuation (keeping sentence punctuation VADER
/// cares about) and whitespace.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let decoded = html_escape::decode_html_entities(text);
    let no_tags = TAG_RE.replace_all(&decoded, " ");
    let no_urls = URL_RE.replace_all(&no_tags, "");
    let no_punct = PUNCT_RE.replace_all(&no_urls, " ");
    SPACE_RE.replace_all(&no_punct, " ").trim().to_string()
}
