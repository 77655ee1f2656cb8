//! The Verge AI section adapter.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use ainews_shared::{ArticleDraft, Result, Source};

use super::{Endpoint, SourceAdapter, fetch_entries};
use crate::feed::FeedEntry;
use crate::fetcher::Fetcher;
use crate::normalize::{RawFields, html_to_text, to_draft};

pub const THE_VERGE_FEED_URL: &str =
    "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml";

#[derive(Debug, Clone)]
pub struct TheVergeAdapter {
    endpoint: Endpoint,
}

impl TheVergeAdapter {
    pub fn new() -> Self {
        Self::with_endpoint(Self::default_endpoint())
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn default_endpoint() -> Endpoint {
        Endpoint::new(THE_VERGE_FEED_URL, 30, Some(Duration::from_secs(30)))
    }
}

impl Default for TheVergeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for TheVergeAdapter {
    fn source(&self) -> Source {
        Source::TheVerge
    }

    fn max_results(&self) -> usize {
        self.endpoint.max_results
    }

    #[instrument(skip_all, fields(source = "the_verge", max_results = max_results))]
    async fn fetch(&self, fetcher: &Fetcher, max_results: usize) -> Result<Vec<ArticleDraft>> {
        let entries = fetch_entries(fetcher, &self.endpoint.url, self.endpoint.timeout).await?;
        let drafts: Vec<ArticleDraft> = entries
            .into_iter()
            .take(max_results)
            .filter_map(map_entry)
            .collect();
        info!(drafts = drafts.len(), "The Verge fetch complete");
        Ok(drafts)
    }
}

/// Summary-only content and no tags.
fn map_entry(entry: FeedEntry) -> Option<ArticleDraft> {
    let url = entry.link?;
    let fields = RawFields {
        title: entry.title,
        url,
        content: html_to_text(entry.summary_html.as_deref().unwrap_or_default()),
        authors: entry.authors.into_iter().take(1).collect(),
        tags: Vec::new(),
        published_at: entry.published,
    };
    to_draft(fields, Source::TheVerge)
}
