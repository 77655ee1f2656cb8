//! Ingestion and enrichment pipeline for AI news.
//!
//! Ties the source adapters, the enrichment client, and the article store
//! together into crawl and process runs.

pub mod enrichment;
pub mod pipeline;

pub use enrichment::{Enricher, EnrichmentClient, FallbackEnricher, RemoteEnricher, WithFallback};
pub use pipeline::{CrawlStats, Orchestrator, ProcessStats, ProgressReporter, SilentProgress};
