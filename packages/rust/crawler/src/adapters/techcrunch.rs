//! TechCrunch AI category adapter (RSS).

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use ainews_shared::{ArticleDraft, Result, Source};

use super::{Endpoint, SourceAdapter, fetch_entries};
use crate::feed::FeedEntry;
use crate::fetcher::Fetcher;
use crate::normalize::{RawFields, html_to_text, to_draft};

pub const TECHCRUNCH_FEED_URL: &str =
    "https://techcrunch.com/category/artificial-intelligence/feed/";

#[derive(Debug, Clone)]
pub struct TechCrunchAdapter {
    endpoint: Endpoint,
}

impl TechCrunchAdapter {
    pub fn new() -> Self {
        Self::with_endpoint(Self::default_endpoint())
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// First 30 entries, 30s timeout.
    pub fn default_endpoint() -> Endpoint {
        Endpoint::new(TECHCRUNCH_FEED_URL, 30, Some(Duration::from_secs(30)))
    }
}

impl Default for TechCrunchAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for TechCrunchAdapter {
    fn source(&self) -> Source {
        Source::Techcrunch
    }

    fn max_results(&self) -> usize {
        self.endpoint.max_results
    }

    #[instrument(skip_all, fields(source = "techcrunch", max_results = max_results))]
    async fn fetch(&self, fetcher: &Fetcher, max_results: usize) -> Result<Vec<ArticleDraft>> {
        let entries = fetch_entries(fetcher, &self.endpoint.url, self.endpoint.timeout).await?;
        let drafts: Vec<ArticleDraft> = entries
            .into_iter()
            .take(max_results)
            .filter_map(map_entry)
            .collect();
        info!(drafts = drafts.len(), "TechCrunch fetch complete");
        Ok(drafts)
    }
}

/// Full body when the feed carries one, otherwise the teaser.
fn map_entry(entry: FeedEntry) -> Option<ArticleDraft> {
    let url = entry.link?;
    let html = entry
        .content_html
        .or(entry.summary_html)
        .unwrap_or_default();

    let fields = RawFields {
        title: entry.title,
        url,
        content: html_to_text(&html),
        authors: entry.authors.into_iter().take(1).collect(),
        tags: entry.categories,
        published_at: entry.published,
    };
    to_draft(fields, Source::Techcrunch)
}
