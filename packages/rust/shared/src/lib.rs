//! Shared types, error model, and configuration for the AI news pipeline.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`AiNewsError`]: the unified error type
//! - Domain types ([`ArticleDraft`], [`CanonicalArticle`], [`Enrichment`], [`Source`], [`Category`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlerConfig, Credential, EnrichmentConfig, ProviderChoice, SourceConfig,
    SourcesConfig, StorageConfig, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from,
};
pub use error::{AiNewsError, Result};
pub use types::{
    ArticleDraft, ArticleId, CanonicalArticle, Category, Enrichment, ProcessingState, Source,
};
