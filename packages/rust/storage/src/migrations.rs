//! SQL migration definitions for the article store.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: articles with unique url",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS articles (
    id                 TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    url                TEXT NOT NULL UNIQUE,
    content            TEXT NOT NULL DEFAULT '',
    authors_json       TEXT NOT NULL DEFAULT '[]',
    tags_json          TEXT NOT NULL DEFAULT '[]',
    source             TEXT NOT NULL,
    published_at       TEXT,
    summary            TEXT,
    title_translated   TEXT,
    summary_translated TEXT,
    category           TEXT NOT NULL DEFAULT 'other',
    quality_score      REAL NOT NULL DEFAULT 0,
    source_authority   REAL NOT NULL DEFAULT 0,
    content_depth      REAL NOT NULL DEFAULT 0,
    state              TEXT NOT NULL DEFAULT 'pending'
                       CHECK (state IN ('pending', 'processed', 'failed')),
    crawled_at         TEXT NOT NULL,
    processed_at       TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_state ON articles(state, crawled_at);
CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Crawl run history",
            sql: r#"
CREATE TABLE IF NOT EXISTS crawl_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
