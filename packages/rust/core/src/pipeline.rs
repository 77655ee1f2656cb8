//! Ingestion and enrichment runs: sources → dedup → store, then pending → enriched.
//!
//! Both entry points always return aggregate statistics. Adapter failures,
//! storage errors on single rows, and enrichment failures are counted and
//! logged; none of them ends a run.
//!
//! Network work for a run finishes before its write batch opens, so the
//! store's transaction is never held across a fetch or a model call.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use ainews_crawler::{AdapterRegistry, Fetcher};
use ainews_shared::{AppConfig, ArticleDraft, Result};
use ainews_storage::{Storage, WriteBatch};

use crate::enrichment::{Enricher, WithFallback};

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Outcome of [`Orchestrator::crawl_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Drafts returned by adapters, duplicates included.
    pub crawled: usize,
    /// Drafts persisted as new articles.
    pub new: usize,
    /// Adapter failures plus rejected or failed inserts.
    pub errors: usize,
}

/// Outcome of [`Orchestrator::process_pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an adapter fetches.
    fn adapter_started(&self, name: &str);
    /// Called after an adapter returns, with its draft count.
    fn adapter_finished(&self, name: &str, drafts: usize, failed: bool);
    /// Called after each article's enrichment call.
    fn article_enriched(&self, title: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn adapter_started(&self, _name: &str) {}
    fn adapter_finished(&self, _name: &str, _drafts: usize, _failed: bool) {}
    fn article_enriched(&self, _title: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Sequences adapters, the dedup gate, and enrichment against one store.
pub struct Orchestrator {
    registry: AdapterRegistry,
    fetcher: Fetcher,
    enricher: Box<dyn Enricher>,
}

impl Orchestrator {
    pub fn new(registry: AdapterRegistry, fetcher: Fetcher, enricher: Box<dyn Enricher>) -> Self {
        Self {
            registry,
            fetcher,
            enricher,
        }
    }

    /// Assemble adapters, fetcher, and enrichment client from config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = AdapterRegistry::from_config(&config.sources, &config.crawler);
        let fetcher = Fetcher::from_config(&config.crawler)?;
        let enricher = WithFallback::from_config(&config.enrichment)?;
        Ok(Self::new(registry, fetcher, Box::new(enricher)))
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn enricher_name(&self) -> &str {
        self.enricher.name()
    }

    /// Fetch every adapter in order, then insert the new drafts in one batch.
    #[instrument(skip_all, fields(adapters = self.registry.len()))]
    pub async fn crawl_all(&self, storage: &Storage, progress: &dyn ProgressReporter) -> CrawlStats {
        let start = Instant::now();
        let mut stats = CrawlStats::default();

        let run_id = match storage.insert_crawl_run().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to record crawl run");
                None
            }
        };

        // --- Phase 1: Fetch ---
        progress.phase("Fetching sources");
        let drafts = self.fetch_all(&mut stats, progress).await;

        // --- Phase 2: Dedup + insert ---
        progress.phase("Saving articles");
        self.save_drafts(storage, &drafts, &mut stats).await;

        if let Some(run_id) = run_id {
            let stats_json = serde_json::json!({
                "crawled": stats.crawled,
                "new": stats.new,
                "errors": stats.errors,
                "duration_ms": start.elapsed().as_millis() as u64,
            });
            if let Err(e) = storage
                .finish_crawl_run(&run_id, &stats_json.to_string())
                .await
            {
                warn!(error = %e, "failed to finish crawl run record");
            }
        }

        info!(
            crawled = stats.crawled,
            new = stats.new,
            errors = stats.errors,
            duration_ms = start.elapsed().as_millis() as u64,
            "crawl completed"
        );
        stats
    }

    async fn fetch_all(
        &self,
        stats: &mut CrawlStats,
        progress: &dyn ProgressReporter,
    ) -> Vec<ArticleDraft> {
        let mut drafts = Vec::new();

        for adapter in self.registry.adapters() {
            let name = adapter.name();
            progress.adapter_started(name);

            match adapter.fetch(&self.fetcher, adapter.max_results()).await {
                Ok(batch) => {
                    info!(adapter = name, drafts = batch.len(), "adapter finished");
                    progress.adapter_finished(name, batch.len(), false);
                    stats.crawled += batch.len();
                    drafts.extend(batch);
                }
                Err(e) => {
                    warn!(adapter = name, error = %e, "adapter failed");
                    progress.adapter_finished(name, 0, true);
                    stats.errors += 1;
                }
            }
        }

        drafts
    }

    async fn save_drafts(&self, storage: &Storage, drafts: &[ArticleDraft], stats: &mut CrawlStats) {
        let batch = match storage.begin_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "could not open write batch");
                stats.errors += 1;
                return;
            }
        };

        let mut new = 0;
        for draft in drafts {
            let seen = batch.exists(&draft.url).await;
            if insert_unseen(&batch, draft, seen, stats).await {
                new += 1;
            }
        }

        match batch.commit().await {
            Ok(()) => stats.new = new,
            Err(e) => {
                warn!(error = %e, discarded = new, "crawl batch commit failed");
                stats.errors += 1;
                stats.new = 0;
            }
        }
    }

    /// Enrich up to `limit` Pending articles and persist every outcome in one batch.
    ///
    /// Each selected row ends Processed or Failed; failed rows are not retried.
    /// Rows are not locked: two concurrent calls can enrich the same row twice.
    #[instrument(skip_all, fields(limit = limit, enricher = self.enricher.name()))]
    pub async fn process_pending(
        &self,
        storage: &Storage,
        limit: usize,
        progress: &dyn ProgressReporter,
    ) -> ProcessStats {
        let mut stats = ProcessStats::default();

        let rows = match storage.select_pending(limit).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to select pending articles");
                return stats;
            }
        };
        stats.selected = rows.len();
        if rows.is_empty() {
            info!("no pending articles");
            return stats;
        }

        // --- Phase 1: Enrich ---
        progress.phase("Enriching articles");
        let total = rows.len();
        let mut outcomes = Vec::with_capacity(total);
        for (i, row) in rows.iter().enumerate() {
            let outcome = self
                .enricher
                .enrich(&row.title, &row.content, row.source)
                .await
                .and_then(|e| e.validate().map(|()| e));
            progress.article_enriched(&row.title, i + 1, total);
            outcomes.push(outcome);
        }

        // --- Phase 2: Persist ---
        progress.phase("Saving enrichment");
        let batch = match storage.begin_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "could not open write batch; rows stay pending");
                return stats;
            }
        };

        let (mut processed, mut failed) = (0, 0);
        for (row, outcome) in rows.iter().zip(outcomes) {
            let applied = match outcome {
                Ok(enrichment) => batch.update_after_enrichment(&row.id, &enrichment).await,
                Err(e) => Err(e),
            };

            match applied {
                Ok(()) => processed += 1,
                Err(e) => {
                    warn!(id = %row.id, url = %row.url, error = %e, "enrichment failed, marking row failed");
                    match batch.mark_failed(&row.id).await {
                        Ok(()) => failed += 1,
                        Err(e) => warn!(id = %row.id, error = %e, "could not mark row failed"),
                    }
                }
            }
        }

        match batch.commit().await {
            Ok(()) => {
                stats.processed = processed;
                stats.failed = failed;
            }
            Err(e) => warn!(error = %e, "enrichment batch commit failed; rows stay pending"),
        }

        info!(
            selected = stats.selected,
            processed = stats.processed,
            failed = stats.failed,
            "processing completed"
        );
        stats
    }

    /// One scheduled cycle: crawl, then enrich up to `limit` pending articles.
    pub async fn run_once(
        &self,
        storage: &Storage,
        limit: usize,
        progress: &dyn ProgressReporter,
    ) -> (CrawlStats, ProcessStats) {
        let crawl = self.crawl_all(storage, progress).await;
        let process = self.process_pending(storage, limit, progress).await;
        (crawl, process)
    }
}

/// Insert `draft` unless the dedup check `seen` found it. Returns true when a row was added.
///
/// A failed check, or an insert the unique url constraint rejects after the
/// check passed, counts as an error.
pub(crate) async fn insert_unseen(
    batch: &WriteBatch,
    draft: &ArticleDraft,
    seen: Result<bool>,
    stats: &mut CrawlStats,
) -> bool {
    match seen {
        Ok(true) => {
            debug!(url = %draft.url, "already stored");
            return false;
        }
        Ok(false) => {}
        Err(e) => {
            warn!(url = %draft.url, error = %e, "dedup check failed");
            stats.errors += 1;
            return false;
        }
    }

    match batch.insert_if_absent(draft).await {
        Ok(true) => true,
        Ok(false) => {
            // another writer stored the url between check and insert
            warn!(url = %draft.url, "insert rejected by unique url constraint");
            stats.errors += 1;
            false
        }
        Err(e) => {
            warn!(url = %draft.url, error = %e, "insert failed");
            stats.errors += 1;
            false
        }
    }
}
