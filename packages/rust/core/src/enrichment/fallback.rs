//! Deterministic enrichment used when no remote result is available.

use async_trait::async_trait;

use ainews_shared::{Category, Enrichment, Result, Source};

use super::Enricher;

/// Prefix marking a field that still needs a real translation.
pub const PENDING_TRANSLATION: &str = "[待翻译] ";

const MAX_SUMMARY_CHARS: usize = 500;
const MAX_TRANSLATED_SUMMARY_CHARS: usize = 200;
const FALLBACK_CONTENT_DEPTH: f64 = 60.0;

/// Keyword buckets in priority order; the first bucket with a hit wins.
const CATEGORY_KEYWORDS: [(Category, &[&str]); 4] = [
    (
        Category::Llm,
        &["gpt", "llm", "language model", "chatgpt", "claude"],
    ),
    (
        Category::Multimodal,
        &["multimodal", "vision-language", "image", "video"],
    ),
    (Category::Agent, &["agent", "autonomous", "tool use"]),
    (Category::Robotics, &["robot", "embodied", "manipulation"]),
];

/// Static authority score per source.
pub fn source_authority(source: Source) -> f64 {
    match source {
        Source::Arxiv => 85.0,
        Source::OpenaiBlog | Source::GoogleAiBlog => 95.0,
        Source::MetaAiBlog => 90.0,
        Source::Techcrunch => 70.0,
        Source::TheVerge => 65.0,
        Source::Jiqizhixin => 75.0,
        Source::Other => 50.0,
    }
}

/// Keyword category over the lowercased title and content.
pub fn keyword_category(title: &str, content: &str) -> Category {
    let text = format!("{} {}", title.to_lowercase(), content.to_lowercase());
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Produce an [`Enrichment`] from the three inputs alone.
///
/// Same inputs, same output: no clock, no randomness, no I/O.
pub fn fallback_enrichment(title: &str, content: &str, source: Source) -> Enrichment {
    let authority = source_authority(source);

    let mut summary = format!("This article discusses {title}. ");
    if !content.is_empty() {
        let sentences: Vec<&str> = content
            .split('.')
            .take(2)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        // non-empty content always gets the terminator, even with no sentences
        summary.push_str(&sentences.join(". "));
        summary.push('.');
    }
    let summary = truncate_chars(&summary, MAX_SUMMARY_CHARS);

    Enrichment {
        title_translated: format!("{PENDING_TRANSLATION}{title}"),
        summary_translated: format!(
            "{PENDING_TRANSLATION}{}",
            truncate_chars(&summary, MAX_TRANSLATED_SUMMARY_CHARS)
        ),
        summary,
        category: keyword_category(title, content),
        tags: Vec::new(),
        // depth 60 weighted 0.6
        quality_score: authority * 0.4 + 36.0,
        content_depth: FALLBACK_CONTENT_DEPTH,
        source_authority: authority,
    }
}

/// First `max` characters (not bytes) of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// [`Enricher`] over [`fallback_enrichment`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackEnricher;

#[async_trait]
impl Enricher for FallbackEnricher {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn enrich(&self, title: &str, content: &str, source: Source) -> Result<Enrichment> {
        Ok(fallback_enrichment(title, content, source))
    }
}
