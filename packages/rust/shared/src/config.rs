//! Application configuration for the AI news pipeline.
//!
//! User config lives at `~/.ainews/ainews.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AiNewsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ainews.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ainews";

// ---------------------------------------------------------------------------
// Config structs (matching ainews.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP fetch settings shared by all sources.
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Per-source overrides.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Remote enrichment settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file. `~` expands to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl StorageConfig {
    /// Resolved database path with `~` expanded.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        expand_home(&self.database_path)
    }
}

fn default_database_path() -> String {
    "~/.ainews/ainews.db".into()
}

/// `[crawler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Default timeout for feed/XML fetches.
    #[serde(default = "default_fetch_timeout")]
    pub feed_timeout_secs: u64,

    /// Default timeout for plain text fetches.
    #[serde(default = "default_fetch_timeout")]
    pub text_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            feed_timeout_secs: default_fetch_timeout(),
            text_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    "AINewsBot/1.0".into()
}
fn default_fetch_timeout() -> u64 {
    30
}

/// `[sources]` section. Each source keeps its own built-in defaults; only the
/// values set here override them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub arxiv: SourceConfig,
    #[serde(default)]
    pub techcrunch: SourceConfig,
    #[serde(default)]
    pub the_verge: SourceConfig,
}

/// `[sources.<name>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Whether the source is crawled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Maximum entries taken per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,

    /// Fetch timeout override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            max_results: None,
            timeout_secs: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which remote provider to use for enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    /// Chat-completion if its key is set, else messages if its key is set.
    #[default]
    Auto,
    Openai,
    Anthropic,
    /// Never call out; always use the deterministic fallback.
    None,
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub provider: ProviderChoice,

    /// Name of the env var holding the chat-completion key (never store the key itself).
    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,

    /// Name of the env var holding the messages API key.
    #[serde(default = "default_anthropic_key_env")]
    pub anthropic_api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// Timeout for one remote enrichment call.
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_secs: u64,

    /// Default number of pending articles enriched per `process` run.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderChoice::default(),
            openai_api_key_env: default_openai_key_env(),
            anthropic_api_key_env: default_anthropic_key_env(),
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            timeout_secs: default_enrichment_timeout(),
            batch_limit: default_batch_limit(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".into()
}
fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".into()
}
fn default_enrichment_timeout() -> u64 {
    60
}
fn default_batch_limit() -> usize {
    20
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A remote enrichment credential, tagged by the transport it authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// `Authorization: Bearer` token for the chat-completion transport.
    BearerToken(String),
    /// `x-api-key` for the messages transport.
    ApiKey(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

impl EnrichmentConfig {
    /// Resolve the credential from the process environment.
    pub fn resolve_credential(&self) -> Option<Credential> {
        self.resolve_credential_with(|name| std::env::var(name).ok())
    }

    /// Resolve the credential using `lookup` to read variables. Empty values count as unset.
    pub fn resolve_credential_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<Credential> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let bearer = || read(&self.openai_api_key_env).map(Credential::BearerToken);
        let api_key = || read(&self.anthropic_api_key_env).map(Credential::ApiKey);

        match self.provider {
            ProviderChoice::None => None,
            ProviderChoice::Openai => bearer(),
            ProviderChoice::Anthropic => api_key(),
            ProviderChoice::Auto => bearer().or_else(api_key),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ainews/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AiNewsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ainews/ainews.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| AiNewsError::config("could not determine home directory"))?;
            Ok(home.join(rest.trim_start_matches(['/', '\\'])))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AiNewsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AiNewsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AiNewsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AiNewsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AiNewsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("AINewsBot/1.0"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.crawler.feed_timeout_secs, 30);
        assert_eq!(parsed.enrichment.timeout_secs, 60);
        assert_eq!(parsed.enrichment.provider, ProviderChoice::Auto);
        assert!(parsed.sources.arxiv.enabled);
    }

    #[test]
    fn partial_source_override() {
        let toml_str = r#"
[sources.arxiv]
max_results = 10

[sources.the_verge]
enabled = false

[enrichment]
provider = "anthropic"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.sources.arxiv.max_results, Some(10));
        assert!(config.sources.arxiv.url.is_none());
        assert!(config.sources.arxiv.enabled);
        assert!(!config.sources.the_verge.enabled);
        assert!(config.sources.techcrunch.enabled);
        assert_eq!(config.enrichment.provider, ProviderChoice::Anthropic);
        assert_eq!(config.enrichment.anthropic_model, "claude-3-haiku-20240307");
    }

    #[test]
    fn credential_resolution_prefers_bearer_in_auto_mode() {
        let config = EnrichmentConfig::default();
        let both = |name: &str| match name {
            "OPENAI_API_KEY" => Some("sk-openai".to_string()),
            "ANTHROPIC_API_KEY" => Some("sk-ant".to_string()),
            _ => None,
        };
        assert_eq!(
            config.resolve_credential_with(both),
            Some(Credential::BearerToken("sk-openai".into()))
        );

        let only_anthropic = |name: &str| match name {
            "ANTHROPIC_API_KEY" => Some("sk-ant".to_string()),
            "OPENAI_API_KEY" => Some("   ".to_string()),
            _ => None,
        };
        assert_eq!(
            config.resolve_credential_with(only_anthropic),
            Some(Credential::ApiKey("sk-ant".into()))
        );

        assert_eq!(config.resolve_credential_with(|_| None), None);
    }

    #[test]
    fn credential_resolution_respects_explicit_provider() {
        let config = EnrichmentConfig {
            provider: ProviderChoice::None,
            ..Default::default()
        };
        assert_eq!(
            config.resolve_credential_with(|_| Some("key".to_string())),
            None
        );

        let config = EnrichmentConfig {
            provider: ProviderChoice::Openai,
            ..Default::default()
        };
        let only_anthropic = |name: &str| (name == "ANTHROPIC_API_KEY").then(|| "k".to_string());
        assert_eq!(config.resolve_credential_with(only_anthropic), None);
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::BearerToken("sk-secret".into());
        assert!(!format!("{cred:?}").contains("sk-secret"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/lib/ainews.db").unwrap(),
            PathBuf::from("/var/lib/ainews.db")
        );
    }
}
