//! Turso Embedded / libSQL article store (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding crawled articles,
//! their enrichment results, and crawl run history. The `url` column carries
//! a `UNIQUE` constraint; that constraint, not [`Storage::exists`], is the
//! authoritative duplicate guard.
//!
//! Writes for one pipeline run go through a [`WriteBatch`], a single
//! transaction committed at the end of the run.

mod migrations;

use std::path::Path;

use ainews_shared::{
    AiNewsError, ArticleDraft, ArticleId, CanonicalArticle, Category, Enrichment, ProcessingState,
    Result, Source,
};
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, Transaction, params};
use serde::Serialize;
use uuid::Uuid;

/// Column list matching [`row_to_article`].
const ARTICLE_COLUMNS: &str = "id, title, url, content, authors_json, tags_json, source, \
     published_at, summary, title_translated, summary_translated, category, quality_score, \
     source_authority, content_depth, state, crawled_at, processed_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AiNewsError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for reporting only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AiNewsError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        AiNewsError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(AiNewsError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Article operations
    // -----------------------------------------------------------------------

    /// Whether an article with this canonical url is already stored.
    pub async fn exists(&self, url: &str) -> Result<bool> {
        url_exists(&self.conn, url).await
    }

    /// Insert `draft` as a new Pending article unless its url is already stored.
    ///
    /// Returns `false` when the unique constraint rejected the row.
    pub async fn insert_if_absent(&self, draft: &ArticleDraft) -> Result<bool> {
        self.check_writable()?;
        insert_article(&self.conn, draft).await
    }

    /// Up to `limit` Pending articles, oldest crawl first.
    pub async fn select_pending(&self, limit: usize) -> Result<Vec<CanonicalArticle>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE state = 'pending' \
             ORDER BY crawled_at, id LIMIT ?1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self.conn.query(&sql, params![limit]).await.map_err(db_err)?;

        let mut articles = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            articles.push(row_to_article(&row)?);
        }
        Ok(articles)
    }

    /// Apply enrichment fields to an article and mark it Processed.
    pub async fn update_after_enrichment(
        &self,
        id: &ArticleId,
        enrichment: &Enrichment,
    ) -> Result<()> {
        self.check_writable()?;
        apply_enrichment(&self.conn, id, enrichment).await
    }

    /// Mark an article Failed, leaving its enrichment fields untouched.
    pub async fn mark_failed(&self, id: &ArticleId) -> Result<()> {
        self.check_writable()?;
        set_failed(&self.conn, id).await
    }

    /// Look up a stored article by canonical url.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<CanonicalArticle>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = ?1");
        let mut rows = self.conn.query(&sql, params![url]).await.map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_article(&row)?)),
            None => Ok(None),
        }
    }

    /// Aggregate counts across the store.
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*),
                        COALESCE(SUM(state = 'processed'), 0),
                        COALESCE(SUM(state = 'pending'), 0),
                        COALESCE(SUM(state = 'failed'), 0),
                        AVG(CASE WHEN state = 'processed' THEN quality_score END)
                 FROM articles",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut stats = StoreStats::default();
        if let Some(row) = rows.next().await.map_err(db_err)? {
            stats.total = count(&row, 0)?;
            stats.processed = count(&row, 1)?;
            stats.pending = count(&row, 2)?;
            stats.failed = count(&row, 3)?;
            // NULL when nothing is processed yet
            stats.avg_quality = row.get::<f64>(4).ok();
        }

        let mut rows = self
            .conn
            .query(
                "SELECT source, COUNT(*) FROM articles GROUP BY source ORDER BY COUNT(*) DESC, source",
                params![],
            )
            .await
            .map_err(db_err)?;
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let source: String = row.get(0).map_err(db_err)?;
            stats.by_source.push((Source::parse(&source), count(&row, 1)?));
        }

        Ok(stats)
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    /// Open a write batch. Nothing written through it is visible to other
    /// connections until [`WriteBatch::commit`].
    pub async fn begin_batch(&self) -> Result<WriteBatch> {
        self.check_writable()?;
        let tx = self.conn.transaction().await.map_err(db_err)?;
        Ok(WriteBatch { tx })
    }

    // -----------------------------------------------------------------------
    // Crawl run history
    // -----------------------------------------------------------------------

    /// Record the start of a crawl run. Returns the generated run ID.
    pub async fn insert_crawl_run(&self) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        self.conn
            .execute(
                "INSERT INTO crawl_runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), timestamp(Utc::now())],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    /// Mark a crawl run finished with its JSON statistics.
    pub async fn finish_crawl_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "UPDATE crawl_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![timestamp(Utc::now()), stats_json, run_id],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Most recently started crawl run, if any.
    pub async fn last_crawl_run(&self) -> Result<Option<CrawlRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, finished_at, stats_json FROM crawl_runs
                 ORDER BY started_at DESC, id DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(db_err)?;

        let Some(row) = rows.next().await.map_err(db_err)? else {
            return Ok(None);
        };
        Ok(Some(CrawlRun {
            id: row.get(0).map_err(db_err)?,
            started_at: parse_timestamp(&row.get::<String>(1).map_err(db_err)?)?,
            finished_at: row
                .get::<String>(2)
                .ok()
                .map(|s| parse_timestamp(&s))
                .transpose()?,
            stats_json: row.get::<String>(3).ok(),
        }))
    }
}

// ---------------------------------------------------------------------------
// WriteBatch
// ---------------------------------------------------------------------------

/// A single transaction grouping the writes of one pipeline run.
///
/// Dropping a batch without committing discards its writes.
pub struct WriteBatch {
    tx: Transaction,
}

impl WriteBatch {
    /// Dedup pre-check that also sees rows inserted earlier in this batch.
    pub async fn exists(&self, url: &str) -> Result<bool> {
        url_exists(&self.tx, url).await
    }

    pub async fn insert_if_absent(&self, draft: &ArticleDraft) -> Result<bool> {
        insert_article(&self.tx, draft).await
    }

    pub async fn update_after_enrichment(
        &self,
        id: &ArticleId,
        enrichment: &Enrichment,
    ) -> Result<()> {
        apply_enrichment(&self.tx, id, enrichment).await
    }

    pub async fn mark_failed(&self, id: &ArticleId) -> Result<()> {
        set_failed(&self.tx, id).await
    }

    /// Persist every write made through this batch.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(db_err)
    }

    /// Discard every write made through this batch.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Store-wide counts returned by [`Storage::stats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: u64,
    pub processed: u64,
    pub pending: u64,
    pub failed: u64,
    /// Mean quality score over Processed rows; `None` when there are none.
    pub avg_quality: Option<f64>,
    /// Article count per source, largest first.
    pub by_source: Vec<(Source, u64)>,
}

/// One row of crawl run history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlRun {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats_json: Option<String>,
}

// ---------------------------------------------------------------------------
// Statement helpers shared by Storage and WriteBatch
// ---------------------------------------------------------------------------

async fn url_exists(conn: &Connection, url: &str) -> Result<bool> {
    let mut rows = conn
        .query("SELECT 1 FROM articles WHERE url = ?1 LIMIT 1", params![url])
        .await
        .map_err(db_err)?;
    Ok(rows.next().await.map_err(db_err)?.is_some())
}

async fn insert_article(conn: &Connection, draft: &ArticleDraft) -> Result<bool> {
    let id = ArticleId::new().to_string();
    let authors = to_json_list(&draft.authors)?;
    let tags = to_json_list(&draft.tags)?;
    let published = draft.published_at.map(timestamp);

    let affected = conn
        .execute(
            "INSERT INTO articles (id, title, url, content, authors_json, tags_json, source,
                                   published_at, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(url) DO NOTHING",
            params![
                id.as_str(),
                draft.title.as_str(),
                draft.url.as_str(),
                draft.content.as_str(),
                authors,
                tags,
                draft.source.as_str(),
                published,
                timestamp(Utc::now()),
            ],
        )
        .await
        .map_err(db_err)?;

    Ok(affected > 0)
}

async fn apply_enrichment(conn: &Connection, id: &ArticleId, e: &Enrichment) -> Result<()> {
    // Empty tag lists keep the tags the adapter supplied.
    let tags = if e.tags.is_empty() {
        None
    } else {
        Some(to_json_list(&e.tags)?)
    };

    let affected = conn
        .execute(
            "UPDATE articles SET
                summary = ?1, title_translated = ?2, summary_translated = ?3,
                category = ?4, tags_json = COALESCE(?5, tags_json),
                quality_score = ?6, content_depth = ?7, source_authority = ?8,
                state = 'processed', processed_at = ?9
             WHERE id = ?10",
            params![
                e.summary.as_str(),
                e.title_translated.as_str(),
                e.summary_translated.as_str(),
                e.category.as_str(),
                tags,
                e.quality_score,
                e.content_depth,
                e.source_authority,
                timestamp(Utc::now()),
                id.to_string(),
            ],
        )
        .await
        .map_err(db_err)?;

    if affected == 0 {
        return Err(AiNewsError::Storage(format!("no article with id {id}")));
    }
    Ok(())
}

async fn set_failed(conn: &Connection, id: &ArticleId) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE articles SET state = ?1, processed_at = ?2 WHERE id = ?3",
            params![
                ProcessingState::Failed.as_str(),
                timestamp(Utc::now()),
                id.to_string(),
            ],
        )
        .await
        .map_err(db_err)?;

    if affected == 0 {
        return Err(AiNewsError::Storage(format!("no article with id {id}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

/// Convert a row selected with [`ARTICLE_COLUMNS`] to a [`CanonicalArticle`].
fn row_to_article(row: &libsql::Row) -> Result<CanonicalArticle> {
    let id: String = row.get(0).map_err(db_err)?;
    let state: String = row.get(15).map_err(db_err)?;

    Ok(CanonicalArticle {
        id: id
            .parse()
            .map_err(|e| AiNewsError::Storage(format!("invalid article id {id}: {e}")))?,
        title: row.get(1).map_err(db_err)?,
        url: row.get(2).map_err(db_err)?,
        content: row.get(3).map_err(db_err)?,
        authors: from_json_list(&row.get::<String>(4).map_err(db_err)?)?,
        tags: from_json_list(&row.get::<String>(5).map_err(db_err)?)?,
        source: Source::parse(&row.get::<String>(6).map_err(db_err)?),
        published_at: row
            .get::<String>(7)
            .ok()
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        summary: row.get::<String>(8).ok(),
        title_translated: row.get::<String>(9).ok(),
        summary_translated: row.get::<String>(10).ok(),
        category: Category::parse(&row.get::<String>(11).map_err(db_err)?),
        quality_score: row.get(12).map_err(db_err)?,
        source_authority: row.get(13).map_err(db_err)?,
        content_depth: row.get(14).map_err(db_err)?,
        state: state.parse()?,
        crawled_at: parse_timestamp(&row.get::<String>(16).map_err(db_err)?)?,
        processed_at: row
            .get::<String>(17)
            .ok()
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    })
}

fn count(row: &libsql::Row, idx: i32) -> Result<u64> {
    let n: i64 = row.get(idx).map_err(db_err)?;
    Ok(u64::try_from(n).unwrap_or(0))
}

fn db_err(e: libsql::Error) -> AiNewsError {
    AiNewsError::Storage(e.to_string())
}

/// RFC 3339 UTC with fixed precision so text order matches time order.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AiNewsError::Storage(format!("invalid date {s:?}: {e}")))
}

fn to_json_list(items: &[String]) -> Result<String> {
    serde_json::to_string(items).map_err(|e| AiNewsError::Storage(e.to_string()))
}

fn from_json_list(s: &str) -> Result<Vec<String>> {
    serde_json::from_str(s).map_err(|e| AiNewsError::Storage(format!("invalid list {s:?}: {e}")))
}
