//! Error type shared by the store, the source adapters, and enrichment.
//!
//! Most of these never leave a run: the orchestrator counts them in its
//! statistics. Only config loading and opening the store reach the CLI.

use std::path::PathBuf;

/// Every failure a library crate can report.
#[derive(Debug, thiserror::Error)]
pub enum AiNewsError {
    /// Unreadable `ainews.toml`, bad home dir, or an invalid endpoint URL.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP client could not be built, or a transport fault an adapter surfaces.
    #[error("network error: {0}")]
    Network(String),

    /// Neither RSS nor Atom, or a model reply without a usable JSON object.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// libSQL failure, including a batch commit that did not land.
    #[error("storage error: {0}")]
    Storage(String),

    /// Remote model call failed: transport error, non-2xx status, or empty reply.
    /// Always resolved by the fallback.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Creating the config or database directory, or reading the config file.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Score outside `0..=100`, or an unknown stored processing state.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Result alias for the library crates.
pub type Result<T> = std::result::Result<T, AiNewsError>;

impl AiNewsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// I/O failure at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
