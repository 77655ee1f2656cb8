//! Field cleanup shared by every source adapter.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Html;

use ainews_shared::{ArticleDraft, Source};

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Strip markup from an HTML fragment, keeping text nodes separated by spaces.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let pieces: Vec<&str> = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    collapse_whitespace(&pieces.join(" "))
}

/// Titles arrive with hard line breaks in some feeds.
pub fn single_line(title: &str) -> String {
    title.replace(['\r', '\n'], " ").trim().to_string()
}

/// Parse an RSS (RFC 2822) or Atom (RFC 3339) date.
pub fn parse_feed_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// Field values an adapter extracted from one entry.
#[derive(Debug, Clone, Default)]
pub struct RawFields {
    pub title: String,
    pub url: String,
    pub content: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Build a draft, or `None` when the entry lacks a title or url.
pub fn to_draft(fields: RawFields, source: Source) -> Option<ArticleDraft> {
    let title = fields.title.trim();
    let url = fields.url.trim();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    Some(ArticleDraft {
        title: title.to_string(),
        url: url.to_string(),
        content: fields.content,
        authors: fields.authors,
        tags: fields.tags,
        published_at: fields.published_at,
        source,
    })
}
