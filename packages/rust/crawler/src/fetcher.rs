//! Timed HTTP retrieval that never fails loudly.
//!
//! Every network, timeout, or status problem is logged and reported as
//! `None`, so a bad endpoint costs one source one cycle and nothing more.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use ainews_shared::{AiNewsError, CrawlerConfig, Result};

/// Accept header for generic page fetches.
const TEXT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept header for RSS/Atom fetches.
const FEED_ACCEPT: &str = "application/xml,application/rss+xml,text/xml";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which Accept header to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Text,
    Feed,
}

impl FetchMode {
    fn accept(self) -> &'static str {
        match self {
            Self::Text => TEXT_ACCEPT,
            Self::Feed => FEED_ACCEPT,
        }
    }
}

/// Shared HTTP client with the crawler's default headers and timeouts.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    text_timeout: Duration,
    feed_timeout: Duration,
}

impl Fetcher {
    /// Build a fetcher from the `[crawler]` config section.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        let mut fetcher = Self::new(&config.user_agent)?;
        fetcher.text_timeout = Duration::from_secs(config.text_timeout_secs);
        fetcher.feed_timeout = Duration::from_secs(config.feed_timeout_secs);
        Ok(fetcher)
    }

    /// Build a fetcher sending `user_agent` on every request, with 30s default timeouts.
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AiNewsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            text_timeout: DEFAULT_TIMEOUT,
            feed_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// GET `url` within `timeout` (or the mode's default). Returns the body
    /// only for a 200 response.
    pub async fn fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
        mode: FetchMode,
    ) -> Option<String> {
        let timeout = timeout.unwrap_or(match mode {
            FetchMode::Text => self.text_timeout,
            FetchMode::Feed => self.feed_timeout,
        });
        debug!(url, ?mode, timeout_ms = timeout.as_millis() as u64, "fetching");

        let response = match self
            .client
            .get(url)
            .header(ACCEPT, mode.accept())
            .timeout(timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                return None;
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(url, status = status.as_u16(), "fetch returned non-200 status");
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url, error = %e, "failed to read response body");
                None
            }
        }
    }

    /// Generic page fetch.
    pub async fn fetch_text(&self, url: &str, timeout: Option<Duration>) -> Option<String> {
        self.fetch(url, timeout, FetchMode::Text).await
    }

    /// RSS/Atom fetch.
    pub async fn fetch_feed(&self, url: &str, timeout: Option<Duration>) -> Option<String> {
        self.fetch(url, timeout, FetchMode::Feed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new("AINewsBot/1.0").expect("build fetcher")
    }

    #[tokio::test]
    async fn returns_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .and(header("user-agent", "AINewsBot/1.0"))
            .and(header("accept-language", "en-US,en;q=0.5"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_text(&format!("{}/ok", server.uri()), Some(Duration::from_secs(5)))
            .await;
        assert_eq!(body.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn feed_mode_sends_feed_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("accept", FEED_ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_feed(&format!("{}/feed", server.uri()), Some(Duration::from_secs(5)))
            .await;
        assert_eq!(body.as_deref(), Some("<rss/>"));
    }

    #[tokio::test]
    async fn non_200_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_feed(&format!("{}/down", server.uri()), Some(Duration::from_secs(5)))
            .await;
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn timeout_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_text(&server.uri(), Some(Duration::from_millis(200)))
            .await;
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn config_timeout_applies_when_none_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = CrawlerConfig {
            feed_timeout_secs: 1,
            ..Default::default()
        };
        let fetcher = Fetcher::from_config(&config).expect("build fetcher");
        assert!(fetcher.fetch_feed(&server.uri(), None).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_none() {
        // port 9 on localhost: nothing listens there in test environments
        let body = fetcher()
            .fetch_text("http://127.0.0.1:9/", Some(Duration::from_secs(2)))
            .await;
        assert!(body.is_none());
    }
}
