//! Article enrichment: summary, translation, category, and scores.
//!
//! One [`Enricher`] capability with two strategies. [`RemoteEnricher`] asks a
//! generative model and may fail; [`FallbackEnricher`] is a pure function of
//! its inputs and never does. [`WithFallback`] composes the two so that no
//! credential and a failed remote call produce the same result.

mod fallback;
mod remote;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use ainews_shared::{Credential, Enrichment, EnrichmentConfig, Result, Source};

pub use fallback::{
    FallbackEnricher, PENDING_TRANSLATION, fallback_enrichment, keyword_category,
    source_authority,
};
pub use remote::{RemoteEnricher, Transport, build_prompt, extract_json_object, parse_reply};

/// Produces an [`Enrichment`] for one article.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Strategy name for tracing.
    fn name(&self) -> &str;

    async fn enrich(&self, title: &str, content: &str, source: Source) -> Result<Enrichment>;
}

/// The enrichment client used by the pipeline.
pub type EnrichmentClient = WithFallback;

/// Optional primary strategy backed by the deterministic fallback.
pub struct WithFallback {
    primary: Option<Box<dyn Enricher>>,
    fallback: FallbackEnricher,
}

impl WithFallback {
    pub fn new(primary: Box<dyn Enricher>) -> Self {
        Self {
            primary: Some(primary),
            fallback: FallbackEnricher,
        }
    }

    /// No remote strategy; every article gets the fallback result.
    pub fn fallback_only() -> Self {
        Self {
            primary: None,
            fallback: FallbackEnricher,
        }
    }

    /// Build from config, reading the credential from the environment.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        Self::from_credential(config.resolve_credential(), config)
    }

    /// Build from an already resolved credential.
    pub fn from_credential(
        credential: Option<Credential>,
        config: &EnrichmentConfig,
    ) -> Result<Self> {
        let Some(credential) = credential else {
            info!("no enrichment credential configured, using fallback only");
            return Ok(Self::fallback_only());
        };

        let transport = Transport::from_credential(credential, config);
        let remote = RemoteEnricher::new(transport, Duration::from_secs(config.timeout_secs))?;
        info!(transport = remote.name(), "remote enrichment enabled");
        Ok(Self::new(Box::new(remote)))
    }

    /// Name of the strategy tried first.
    pub fn primary_name(&self) -> &str {
        match &self.primary {
            Some(p) => p.name(),
            None => self.fallback.name(),
        }
    }

    /// Enrich one article. Never fails.
    pub async fn process(&self, title: &str, content: &str, source: Source) -> Enrichment {
        if let Some(primary) = &self.primary {
            match primary.enrich(title, content, source).await {
                Ok(enrichment) => return enrichment,
                Err(e) => {
                    warn!(
                        strategy = primary.name(),
                        error = %e,
                        "enrichment failed, using fallback"
                    );
                }
            }
        }
        fallback_enrichment(title, content, source)
    }
}

#[async_trait]
impl Enricher for WithFallback {
    fn name(&self) -> &str {
        self.primary_name()
    }

    async fn enrich(&self, title: &str, content: &str, source: Source) -> Result<Enrichment> {
        Ok(self.process(title, content, source).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ainews_shared::{AiNewsError, ProviderChoice};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct AlwaysFails;

    #[async_trait]
    impl Enricher for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }

        async fn enrich(&self, _: &str, _: &str, _: Source) -> Result<Enrichment> {
            Err(AiNewsError::Enrichment("boom".into()))
        }
    }

    fn config_for(server: &MockServer) -> EnrichmentConfig {
        EnrichmentConfig {
            openai_base_url: server.uri(),
            anthropic_base_url: server.uri(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_credential_uses_fallback() {
        let client = WithFallback::from_credential(None, &EnrichmentConfig::default()).unwrap();
        assert_eq!(client.primary_name(), "fallback");
        let e = client.process("GPT news", "Body.", Source::Arxiv).await;
        assert_eq!(e, fallback_enrichment("GPT news", "Body.", Source::Arxiv));
    }

    #[tokio::test]
    async fn provider_none_ignores_credentials() {
        let config = EnrichmentConfig {
            provider: ProviderChoice::None,
            ..Default::default()
        };
        let credential = config.resolve_credential_with(|_| Some("key".into()));
        let client = WithFallback::from_credential(credential, &config).unwrap();
        assert_eq!(client.primary_name(), "fallback");
    }

    #[tokio::test]
    async fn failing_primary_converges_on_fallback() {
        let client = WithFallback::new(Box::new(AlwaysFails));
        let e = client.enrich("Robot", "Arm.", Source::Techcrunch).await.unwrap();
        assert_eq!(e, fallback_enrichment("Robot", "Arm.", Source::Techcrunch));
    }

    #[tokio::test]
    async fn http_500_equals_direct_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = WithFallback::from_credential(
            Some(Credential::BearerToken("sk-test".into())),
            &config_for(&server),
        )
        .unwrap();
        assert_eq!(client.primary_name(), "chat_completion");

        let title = "Multimodal agents";
        let content = "A video model. It plans. It acts.";
        let e = client.process(title, content, Source::TheVerge).await;
        assert_eq!(e, fallback_enrichment(title, content, Source::TheVerge));
    }

    #[tokio::test]
    async fn unparsable_reply_equals_direct_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "I cannot help with that."}]
            })))
            .mount(&server)
            .await;

        let client = WithFallback::from_credential(
            Some(Credential::ApiKey("ak-test".into())),
            &config_for(&server),
        )
        .unwrap();
        let e = client.process("T", "C.", Source::Arxiv).await;
        assert_eq!(e, fallback_enrichment("T", "C.", Source::Arxiv));
    }

    #[tokio::test]
    async fn successful_remote_result_is_used() {
        let server = MockServer::start().await;
        let reply = r#"{"summary": "Remote.", "title_zh": "远程", "summary_zh": "远程摘要",
            "category": "business", "tags": ["funding"], "quality_score": 66,
            "content_depth": 55, "source_authority": 70}"#;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": reply}}]
            })))
            .mount(&server)
            .await;

        let client = WithFallback::from_credential(
            Some(Credential::BearerToken("sk-test".into())),
            &config_for(&server),
        )
        .unwrap();
        let e = client.process("T", "C", Source::Techcrunch).await;
        assert_eq!(e.summary, "Remote.");
        assert_eq!(e.category, ainews_shared::Category::Business);
        assert_eq!(e.tags, vec!["funding"]);
    }
}
