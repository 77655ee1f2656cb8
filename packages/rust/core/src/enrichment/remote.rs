//! Remote generative enrichment over HTTP.
//!
//! Two wire shapes are supported: a chat-completion endpoint authenticated
//! with a bearer token and a messages endpoint authenticated with an API key.
//! Both send the same prompt and expect a JSON object somewhere in the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ainews_shared::{
    AiNewsError, Category, Credential, Enrichment, EnrichmentConfig, Result, Source,
};

use super::Enricher;
use super::fallback::truncate_chars;

const MAX_PROMPT_CONTENT_CHARS: usize = 8000;
const MAX_TOKENS: u32 = 2000;
const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "You are an AI news analyst. Always respond in valid JSON format.";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Endpoint shape and credentials for one provider.
#[derive(Debug, Clone)]
pub enum Transport {
    /// `POST {base_url}/v1/chat/completions` with `Authorization: Bearer`.
    ChatCompletion {
        base_url: String,
        model: String,
        token: String,
    },
    /// `POST {base_url}/v1/messages` with `x-api-key`.
    Messages {
        base_url: String,
        model: String,
        api_key: String,
    },
}

impl Transport {
    /// Pick the transport matching a resolved credential.
    pub fn from_credential(credential: Credential, config: &EnrichmentConfig) -> Self {
        match credential {
            Credential::BearerToken(token) => Self::ChatCompletion {
                base_url: config.openai_base_url.clone(),
                model: config.openai_model.clone(),
                token,
            },
            Credential::ApiKey(api_key) => Self::Messages {
                base_url: config.anthropic_base_url.clone(),
                model: config.anthropic_model.clone(),
                api_key,
            },
        }
    }

    /// Short transport name for logs and `config show`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChatCompletion { .. } => "chat_completion",
            Self::Messages { .. } => "messages",
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<MessagesBlock>,
}

#[derive(Debug, Deserialize)]
struct MessagesBlock {
    #[serde(default)]
    text: Option<String>,
}

/// The JSON object the prompt asks for. Any other shape is a deviation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnrichmentPayload {
    summary: String,
    title_zh: String,
    summary_zh: String,
    category: String,
    tags: Vec<String>,
    quality_score: f64,
    content_depth: f64,
    source_authority: f64,
}

impl From<EnrichmentPayload> for Enrichment {
    fn from(p: EnrichmentPayload) -> Self {
        Self {
            summary: p.summary,
            title_translated: p.title_zh,
            summary_translated: p.summary_zh,
            category: Category::parse(&p.category),
            tags: p.tags,
            quality_score: p.quality_score,
            content_depth: p.content_depth,
            source_authority: p.source_authority,
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteEnricher
// ---------------------------------------------------------------------------

/// Calls a remote model once per article. Every failure is an `Err`.
#[derive(Debug, Clone)]
pub struct RemoteEnricher {
    client: Client,
    transport: Transport,
    timeout: Duration,
}

impl RemoteEnricher {
    pub fn new(transport: Transport, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AiNewsError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            transport,
            timeout,
        })
    }

    /// Send the prompt and return the assistant's raw text.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = match &self.transport {
            Transport::ChatCompletion {
                base_url,
                model,
                token,
            } => self
                .client
                .post(format!("{}/v1/chat/completions", base_url.trim_end_matches('/')))
                .bearer_auth(token)
                .json(&ChatCompletionRequest {
                    model,
                    messages: vec![
                        WireMessage {
                            role: "system",
                            content: SYSTEM_PROMPT,
                        },
                        WireMessage {
                            role: "user",
                            content: prompt,
                        },
                    ],
                    temperature: 0.3,
                    max_tokens: MAX_TOKENS,
                }),
            Transport::Messages {
                base_url,
                model,
                api_key,
            } => self
                .client
                .post(format!("{}/v1/messages", base_url.trim_end_matches('/')))
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&MessagesRequest {
                    model,
                    max_tokens: MAX_TOKENS,
                    messages: vec![WireMessage {
                        role: "user",
                        content: prompt,
                    }],
                }),
        };

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AiNewsError::Enrichment(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiNewsError::Enrichment(format!(
                "{} endpoint returned {status}",
                self.transport.label()
            )));
        }

        let text = match &self.transport {
            Transport::ChatCompletion { .. } => response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| AiNewsError::Enrichment(format!("invalid response body: {e}")))?
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
            Transport::Messages { .. } => response
                .json::<MessagesResponse>()
                .await
                .map_err(|e| AiNewsError::Enrichment(format!("invalid response body: {e}")))?
                .content
                .into_iter()
                .next()
                .and_then(|b| b.text),
        };

        text.ok_or_else(|| AiNewsError::Enrichment("response carried no text".into()))
    }
}

#[async_trait]
impl Enricher for RemoteEnricher {
    fn name(&self) -> &str {
        self.transport.label()
    }

    #[instrument(skip_all, fields(source = %source))]
    async fn enrich(&self, title: &str, content: &str, source: Source) -> Result<Enrichment> {
        let prompt = build_prompt(title, content, source);
        let reply = self.complete(&prompt).await?;
        debug!(
            transport = self.transport.label(),
            reply_len = reply.len(),
            "remote enrichment reply received"
        );
        parse_reply(&reply)
    }
}

// ---------------------------------------------------------------------------
// Prompt and reply handling
// ---------------------------------------------------------------------------

/// Fixed analysis prompt. Content beyond 8000 characters is cut and marked with `...`.
pub fn build_prompt(title: &str, content: &str, source: Source) -> String {
    let content = if content.chars().count() > MAX_PROMPT_CONTENT_CHARS {
        format!("{}...", truncate_chars(content, MAX_PROMPT_CONTENT_CHARS))
    } else {
        content.to_string()
    };

    format!(
        r#"Analyze this AI-related article and provide:
1. A concise English summary (3 sentences: what it is, why it matters, what's the impact)
2. Chinese translation of the title
3. Chinese translation of the summary
4. Category classification
5. Quality scores

Article Title: {title}
Source: {source}
Content: {content}

Respond in this exact JSON format:
{{
    "summary": "3-sentence English summary here",
    "title_zh": "中文标题",
    "summary_zh": "三句话中文摘要",
    "category": "one of: llm, multimodal, agent, cv, nlp, rl, robotics, ai_safety, business, other",
    "tags": ["tag1", "tag2", "tag3"],
    "quality_score": 75,
    "content_depth": 70,
    "source_authority": 80
}}

Quality scoring guidelines (0-100):
- source_authority: Official blogs (90-100), Top media (70-85), Others (40-60)
- content_depth: Technical details, novelty, comprehensiveness
- quality_score: Overall weighted average"#
    )
}

/// Slice from the first `{` through the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse and validate the JSON object embedded in a model reply.
pub fn parse_reply(reply: &str) -> Result<Enrichment> {
    let json = extract_json_object(reply)
        .ok_or_else(|| AiNewsError::parse("no JSON object in enrichment reply"))?;
    let payload: EnrichmentPayload = serde_json::from_str(json)
        .map_err(|e| AiNewsError::parse(format!("unexpected enrichment JSON: {e}")))?;

    let enrichment = Enrichment::from(payload);
    enrichment.validate()?;
    Ok(enrichment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPLY: &str = r#"Sure! Here is the analysis:
```json
{"summary": "S.", "title_zh": "标题", "summary_zh": "摘要", "category": "nlp",
 "tags": ["llm", "eval"], "quality_score": 82, "content_depth": 75, "source_authority": 85}
```"#;

    fn chat(server: &MockServer) -> RemoteEnricher {
        RemoteEnricher::new(
            Transport::ChatCompletion {
                base_url: server.uri(),
                model: "gpt-4o-mini".into(),
                token: "sk-test".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn prompt_embeds_inputs_and_truncates() {
        let prompt = build_prompt("T", &"x".repeat(9000), Source::Arxiv);
        assert!(prompt.contains("Article Title: T"));
        assert!(prompt.contains("Source: arxiv"));
        assert!(prompt.contains(&format!("Content: {}...", "x".repeat(8000))));
        assert!(!prompt.contains(&"x".repeat(8001)));

        let short = build_prompt("T", "short body", Source::Other);
        assert!(short.contains("Content: short body\n"));
    }

    #[test]
    fn extracts_outermost_braces() {
        assert_eq!(extract_json_object("a {\"x\": {\"y\": 1}} b"), Some("{\"x\": {\"y\": 1}}"));
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn parses_valid_reply() {
        let e = parse_reply(REPLY).expect("valid reply");
        assert_eq!(e.summary, "S.");
        assert_eq!(e.title_translated, "标题");
        assert_eq!(e.category, Category::Nlp);
        assert_eq!(e.tags, vec!["llm", "eval"]);
        assert_eq!(e.quality_score, 82.0);
    }

    #[test]
    fn unknown_category_is_other_not_an_error() {
        let reply = r#"{"summary": "S", "title_zh": "t", "summary_zh": "s", "category": "quantum",
            "tags": [], "quality_score": 50, "content_depth": 50, "source_authority": 50}"#;
        assert_eq!(parse_reply(reply).unwrap().category, Category::Other);
    }

    #[test]
    fn deviations_are_errors() {
        // missing field
        assert!(parse_reply(r#"{"summary": "S"}"#).is_err());
        // unknown field
        let extra = r#"{"summary": "S", "title_zh": "t", "summary_zh": "s", "category": "llm",
            "tags": [], "quality_score": 50, "content_depth": 50, "source_authority": 50, "mood": "happy"}"#;
        assert!(parse_reply(extra).is_err());
        // out of range
        let range = r#"{"summary": "S", "title_zh": "t", "summary_zh": "s", "category": "llm",
            "tags": [], "quality_score": 150, "content_depth": 50, "source_authority": 50}"#;
        assert!(parse_reply(range).is_err());
        assert!(parse_reply("not json at all").is_err());
    }

    #[tokio::test]
    async fn chat_completion_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 2000,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": REPLY}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let e = chat(&server)
            .enrich("T", "C", Source::Arxiv)
            .await
            .expect("remote enrichment");
        assert_eq!(e.category, Category::Nlp);
    }

    #[tokio::test]
    async fn messages_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-3-haiku-20240307",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": REPLY}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let enricher = RemoteEnricher::new(
            Transport::Messages {
                base_url: server.uri(),
                model: "claude-3-haiku-20240307".into(),
                api_key: "ak-test".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap();
        let e = enricher.enrich("T", "C", Source::Arxiv).await.unwrap();
        assert_eq!(e.summary_translated, "摘要");
    }

    #[tokio::test]
    async fn server_error_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(chat(&server).enrich("T", "C", Source::Arxiv).await.is_err());
    }

    #[tokio::test]
    async fn timeout_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let enricher = RemoteEnricher::new(
            Transport::ChatCompletion {
                base_url: server.uri(),
                model: "m".into(),
                token: "t".into(),
            },
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(enricher.enrich("T", "C", Source::Arxiv).await.is_err());
    }
}
