//! Source adapter trait and the built-in AI news sources.
//!
//! Each adapter owns its endpoint and maps one external feed into
//! [`ArticleDraft`]s. Malformed entries are skipped one by one, and a
//! missing or unparsable document yields no drafts. An `Err` is reserved for
//! adapter faults such as an invalid endpoint.

mod arxiv;
mod techcrunch;
mod the_verge;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use ainews_shared::{ArticleDraft, CrawlerConfig, Result, Source, SourceConfig, SourcesConfig};

use crate::feed::{FeedEntry, parse_feed};
use crate::fetcher::Fetcher;

pub use arxiv::{ARXIV_API_URL, ArxivAdapter};
pub use techcrunch::{TECHCRUNCH_FEED_URL, TechCrunchAdapter};
pub use the_verge::{THE_VERGE_FEED_URL, TheVergeAdapter};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One external news source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source tag stamped on every draft.
    fn source(&self) -> Source;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str {
        self.source().as_str()
    }

    /// Configured number of entries to take per run.
    fn max_results(&self) -> usize;

    /// Fetch and parse up to `max_results` drafts.
    async fn fetch(&self, fetcher: &Fetcher, max_results: usize) -> Result<Vec<ArticleDraft>>;
}

/// Where and how an adapter fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub max_results: usize,
    /// `None` uses the fetcher's feed timeout.
    pub timeout: Option<Duration>,
}

impl Endpoint {
    pub fn new(url: &str, max_results: usize, timeout: Option<Duration>) -> Self {
        Self {
            url: url.to_string(),
            max_results,
            timeout,
        }
    }

    /// Apply the values set in a `[sources.<name>]` section.
    fn apply(mut self, config: &SourceConfig) -> Self {
        if let Some(url) = &config.url {
            self.url = url.clone();
        }
        if let Some(max) = config.max_results {
            self.max_results = max;
        }
        if let Some(secs) = config.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        self
    }
}

/// Fetch a feed document and split it into entries.
///
/// No response, or a body that is not a feed, means no data this cycle:
/// an empty list, logged at `warn`.
async fn fetch_entries(
    fetcher: &Fetcher,
    endpoint: &str,
    timeout: Option<Duration>,
) -> Result<Vec<FeedEntry>> {
    let Some(body) = fetcher.fetch_feed(endpoint, timeout).await else {
        warn!(endpoint, "no feed data this cycle");
        return Ok(Vec::new());
    };
    match parse_feed(&body) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!(endpoint, error = %e, "unreadable feed document, skipping");
            Ok(Vec::new())
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds adapters in the fixed order they are crawled.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// All built-in adapters with their default endpoints: arXiv, TechCrunch, The Verge.
    pub fn new() -> Self {
        Self::with_adapters(vec![
            Box::new(ArxivAdapter::new()),
            Box::new(TechCrunchAdapter::new()),
            Box::new(TheVergeAdapter::new()),
        ])
    }

    /// Built-in adapters with config overrides applied; disabled sources are left out.
    pub fn from_config(sources: &SourcesConfig, crawler: &CrawlerConfig) -> Self {
        let feed_timeout = Some(Duration::from_secs(crawler.feed_timeout_secs));
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

        if sources.arxiv.enabled {
            adapters.push(Box::new(ArxivAdapter::with_endpoint(
                ArxivAdapter::default_endpoint().apply(&sources.arxiv),
            )));
        }
        if sources.techcrunch.enabled {
            let mut endpoint = TechCrunchAdapter::default_endpoint();
            endpoint.timeout = feed_timeout;
            adapters.push(Box::new(TechCrunchAdapter::with_endpoint(
                endpoint.apply(&sources.techcrunch),
            )));
        }
        if sources.the_verge.enabled {
            let mut endpoint = TheVergeAdapter::default_endpoint();
            endpoint.timeout = feed_timeout;
            adapters.push(Box::new(TheVergeAdapter::with_endpoint(
                endpoint.apply(&sources.the_verge),
            )));
        }

        Self::with_adapters(adapters)
    }

    /// A registry over an explicit adapter list, kept in the given order.
    pub fn with_adapters(adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Box<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_fixed() {
        let registry = AdapterRegistry::new();
        assert_eq!(registry.names(), vec!["arxiv", "techcrunch", "the_verge"]);
    }

    #[test]
    fn from_config_skips_disabled_and_applies_overrides() {
        let mut sources = SourcesConfig::default();
        sources.techcrunch.enabled = false;
        sources.arxiv.max_results = Some(5);

        let registry = AdapterRegistry::from_config(&sources, &CrawlerConfig::default());
        assert_eq!(registry.names(), vec!["arxiv", "the_verge"]);
        assert_eq!(registry.adapters()[0].max_results(), 5);
        assert_eq!(registry.adapters()[1].max_results(), 30);
    }

    #[test]
    fn endpoint_overrides() {
        let config = SourceConfig {
            url: Some("http://localhost/feed".into()),
            timeout_secs: Some(3),
            ..Default::default()
        };
        let endpoint = Endpoint::new("https://a", 10, None).apply(&config);
        assert_eq!(endpoint.url, "http://localhost/feed");
        assert_eq!(endpoint.max_results, 10);
        assert_eq!(endpoint.timeout, Some(Duration::from_secs(3)));
    }
}
