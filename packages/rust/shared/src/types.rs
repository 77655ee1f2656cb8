//! Core domain types for ingested articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AiNewsError, Result};

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for article identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Generate a new time-sortable article identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where an article came from. Closed set; anything unrecognized is [`Source::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Arxiv,
    OpenaiBlog,
    GoogleAiBlog,
    MetaAiBlog,
    Techcrunch,
    TheVerge,
    Jiqizhixin,
    #[default]
    Other,
}

impl Source {
    /// Every variant, in declaration order.
    pub const ALL: [Source; 8] = [
        Self::Arxiv,
        Self::OpenaiBlog,
        Self::GoogleAiBlog,
        Self::MetaAiBlog,
        Self::Techcrunch,
        Self::TheVerge,
        Self::Jiqizhixin,
        Self::Other,
    ];

    /// Wire/storage identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arxiv => "arxiv",
            Self::OpenaiBlog => "openai_blog",
            Self::GoogleAiBlog => "google_ai_blog",
            Self::MetaAiBlog => "meta_ai_blog",
            Self::Techcrunch => "techcrunch",
            Self::TheVerge => "the_verge",
            Self::Jiqizhixin => "jiqizhixin",
            Self::Other => "other",
        }
    }

    /// Parse an external identifier. Unknown values become [`Source::Other`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Source> for String {
    fn from(s: Source) -> Self {
        s.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Topic category assigned during enrichment. Closed set; default is [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Llm,
    Multimodal,
    Agent,
    Cv,
    Nlp,
    Rl,
    Robotics,
    AiSafety,
    Business,
    #[default]
    Other,
}

impl Category {
    /// Every variant, in declaration order.
    pub const ALL: [Category; 10] = [
        Self::Llm,
        Self::Multimodal,
        Self::Agent,
        Self::Cv,
        Self::Nlp,
        Self::Rl,
        Self::Robotics,
        Self::AiSafety,
        Self::Business,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Multimodal => "multimodal",
            Self::Agent => "agent",
            Self::Cv => "cv",
            Self::Nlp => "nlp",
            Self::Rl => "rl",
            Self::Robotics => "robotics",
            Self::AiSafety => "ai_safety",
            Self::Business => "business",
            Self::Other => "other",
        }
    }

    /// Parse an external category string. Unknown values become [`Category::Other`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(Self::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// ProcessingState
// ---------------------------------------------------------------------------

/// Enrichment lifecycle of a stored article.
///
/// Rows start `Pending` and move exactly once to `Processed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    Processed,
    Failed,
}

impl ProcessingState {
    /// Storage value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ProcessingState {
    type Err = AiNewsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(AiNewsError::validation(format!(
                "unknown processing state: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ArticleDraft
// ---------------------------------------------------------------------------

/// An adapter-parsed article that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    /// Canonical address; the deduplication key.
    pub url: String,
    /// Plain-text body or abstract.
    pub content: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub source: Source,
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Output of the enrichment step for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub summary: String,
    pub title_translated: String,
    pub summary_translated: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub quality_score: f64,
    pub content_depth: f64,
    pub source_authority: f64,
}

impl Enrichment {
    /// Check that every score is a finite number in `[0, 100]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quality_score", self.quality_score),
            ("content_depth", self.content_depth),
            ("source_authority", self.source_authority),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(AiNewsError::validation(format!(
                    "{name} {value} outside 0..=100"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CanonicalArticle
// ---------------------------------------------------------------------------

/// A stored article with its enrichment fields and processing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    pub id: ArticleId,
    pub title: String,
    /// Unique across the store.
    pub url: String,
    pub content: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_translated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_translated: Option<String>,
    pub category: Category,
    pub quality_score: f64,
    pub source_authority: f64,
    pub content_depth: f64,
    pub state: ProcessingState,
    pub crawled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_roundtrip() {
        let id = ArticleId::new();
        let s = id.to_string();
        let parsed: ArticleId = s.parse().expect("parse ArticleId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn source_parse_known_and_unknown() {
        assert_eq!(Source::parse("arxiv"), Source::Arxiv);
        assert_eq!(Source::parse(" The_Verge "), Source::TheVerge);
        assert_eq!(Source::parse("hacker_news"), Source::Other);
        assert_eq!(Source::parse(""), Source::Other);
    }

    #[test]
    fn category_parse_unknown_maps_to_other() {
        assert_eq!(Category::parse("ai_safety"), Category::AiSafety);
        assert_eq!(Category::parse("LLM"), Category::Llm);
        assert_eq!(Category::parse("quantum"), Category::Other);
        assert_eq!(Category::default(), Category::Other);
    }

    #[test]
    fn enums_serialize_as_wire_strings() {
        let json = serde_json::to_string(&Source::GoogleAiBlog).expect("serialize");
        assert_eq!(json, r#""google_ai_blog""#);

        let cat: Category = serde_json::from_str(r#""not-a-category""#).expect("deserialize");
        assert_eq!(cat, Category::Other);
    }

    #[test]
    fn processing_state_parse() {
        assert_eq!(
            "processed".parse::<ProcessingState>().unwrap(),
            ProcessingState::Processed
        );
        assert!("done".parse::<ProcessingState>().is_err());
    }

    #[test]
    fn enrichment_validate_rejects_out_of_range() {
        let mut e = Enrichment {
            summary: "s".into(),
            title_translated: "t".into(),
            summary_translated: "st".into(),
            category: Category::Llm,
            tags: vec![],
            quality_score: 70.0,
            content_depth: 60.0,
            source_authority: 85.0,
        };
        assert!(e.validate().is_ok());

        e.quality_score = 101.0;
        assert!(e.validate().is_err());

        e.quality_score = f64::NAN;
        assert!(e.validate().is_err());
    }
}
