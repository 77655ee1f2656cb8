//! arXiv API adapter (Atom).

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use url::Url;

use ainews_shared::{AiNewsError, ArticleDraft, Result, Source};

use super::{Endpoint, SourceAdapter, fetch_entries};
use crate::feed::FeedEntry;
use crate::fetcher::Fetcher;
use crate::normalize::{RawFields, collapse_whitespace, single_line, to_draft};

/// Export API query endpoint.
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// AI-related arXiv categories queried.
const CATEGORIES: [&str; 6] = ["cs.AI", "cs.CL", "cs.CV", "cs.LG", "cs.NE", "cs.RO"];

/// Most recent submissions across the AI categories.
#[derive(Debug, Clone)]
pub struct ArxivAdapter {
    endpoint: Endpoint,
}

impl ArxivAdapter {
    pub fn new() -> Self {
        Self::with_endpoint(Self::default_endpoint())
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// 50 results, 60s timeout.
    pub fn default_endpoint() -> Endpoint {
        Endpoint::new(ARXIV_API_URL, 50, Some(Duration::from_secs(60)))
    }

    /// Query URL for the newest `max_results` submissions.
    pub fn query_url(&self, max_results: usize) -> Result<Url> {
        let query = format!(
            "({})",
            CATEGORIES
                .iter()
                .map(|c| format!("cat:{c}"))
                .collect::<Vec<_>>()
                .join(" OR ")
        );

        let mut url = Url::parse(&self.endpoint.url).map_err(|e| {
            AiNewsError::config(format!("invalid arXiv endpoint {}: {e}", self.endpoint.url))
        })?;
        url.query_pairs_mut()
            .append_pair("search_query", &query)
            .append_pair("start", "0")
            .append_pair("max_results", &max_results.to_string())
            .append_pair("sortBy", "submittedDate")
            .append_pair("sortOrder", "descending");
        Ok(url)
    }
}

impl Default for ArxivAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn source(&self) -> Source {
        Source::Arxiv
    }

    fn max_results(&self) -> usize {
        self.endpoint.max_results
    }

    #[instrument(skip_all, fields(source = "arxiv", max_results = max_results))]
    async fn fetch(&self, fetcher: &Fetcher, max_results: usize) -> Result<Vec<ArticleDraft>> {
        let url = self.query_url(max_results)?;
        let entries = fetch_entries(fetcher, url.as_str(), self.endpoint.timeout).await?;
        let total = entries.len().min(max_results);

        let drafts: Vec<ArticleDraft> = entries
            .into_iter()
            .take(max_results)
            .filter_map(map_entry)
            .collect();
        if drafts.len() < total {
            debug!(skipped = total - drafts.len(), "skipped malformed entries");
        }
        info!(drafts = drafts.len(), "arXiv fetch complete");
        Ok(drafts)
    }
}

/// Map one API entry; entries without an id or title are skipped.
fn map_entry(entry: FeedEntry) -> Option<ArticleDraft> {
    let raw_id = entry.id.as_deref().unwrap_or_default();
    let arxiv_id = raw_id.rsplit("/abs/").next().unwrap_or(raw_id).trim();
    if arxiv_id.is_empty() {
        return None;
    }

    let fields = RawFields {
        title: single_line(&entry.title),
        url: format!("https://arxiv.org/abs/{arxiv_id}"),
        content: collapse_whitespace(entry.summary_html.as_deref().unwrap_or_default()),
        authors: entry.authors,
        tags: entry.categories,
        published_at: entry.published,
    };
    to_draft(fields, Source::Arxiv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-05-14T00:00:00-04:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2405.01234v1</id>
    <updated>2024-05-13T17:59:59Z</updated>
    <published>2024-05-13T17:59:59Z</published>
    <title>Scaling Laws for
  Language Agents</title>
    <summary>  We study   scaling.
  Results follow.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2405.01234v1" rel="alternate" type="text/html"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2405.09999v1</id>
    <updated>2024-05-13T17:59:59Z</updated>
    <title></title>
    <summary>Untitled entry is malformed.</summary>
  </entry>
</feed>"#;

    fn adapter_for(server: &MockServer) -> ArxivAdapter {
        ArxivAdapter::with_endpoint(Endpoint::new(
            &format!("{}/api/query", server.uri()),
            50,
            Some(Duration::from_secs(5)),
        ))
    }

    #[test]
    fn query_url_contains_category_filter() {
        let url = ArxivAdapter::new().query_url(50).expect("url");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&(
            "search_query".into(),
            "(cat:cs.AI OR cat:cs.CL OR cat:cs.CV OR cat:cs.LG OR cat:cs.NE OR cat:cs.RO)".into()
        )));
        assert!(pairs.contains(&("max_results".into(), "50".into())));
        assert!(pairs.contains(&("sortBy".into(), "submittedDate".into())));
        assert!(pairs.contains(&("sortOrder".into(), "descending".into())));
    }

    #[tokio::test]
    async fn maps_entries_and_skips_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("max_results", "7"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new("AINewsBot/1.0").unwrap();
        let drafts = adapter_for(&server).fetch(&fetcher, 7).await.expect("fetch");
        assert_eq!(drafts.len(), 1);

        let d = &drafts[0];
        assert_eq!(d.url, "https://arxiv.org/abs/2405.01234v1");
        assert_eq!(d.title, "Scaling Laws for   Language Agents");
        assert_eq!(d.content, "We study scaling. Results follow.");
        assert_eq!(d.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(d.tags, vec!["cs.CL", "cs.AI"]);
        assert_eq!(d.source, Source::Arxiv);
        assert!(d.published_at.is_some());
    }

    #[tokio::test]
    async fn failed_response_yields_no_drafts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new("AINewsBot/1.0").unwrap();
        let drafts = adapter_for(&server).fetch(&fetcher, 5).await.expect("no data is not an error");
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn garbage_document_yields_no_drafts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new("AINewsBot/1.0").unwrap();
        let drafts = adapter_for(&server).fetch(&fetcher, 5).await.expect("no data is not an error");
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn invalid_endpoint_is_an_error() {
        let adapter = ArxivAdapter::with_endpoint(Endpoint::new("not a url", 5, None));
        let fetcher = Fetcher::new("AINewsBot/1.0").unwrap();
        let err = adapter.fetch(&fetcher, 5).await.unwrap_err();
        assert!(err.to_string().contains("invalid arXiv endpoint"));
    }
}
