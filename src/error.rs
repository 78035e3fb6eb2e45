// src/error.rs
//! Error taxonomy shared by every stage of a run.
//!
//! Each concern owns one enum. `RunError` is what the orchestrator hands back;
//! per-post `PublishError`s never reach it, they stay inside the dispatch report.

use std::path::PathBuf;

/// Problems found before any I/O happens. Never retryable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config file found (tried: {tried})")]
    NoConfigFile { tried: String },

    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("feed name is required")]
    MissingFeedName,

    #[error("feed not in config: {0}")]
    FeedNotFound(String),

    #[error("feed `{feed}`: feed_url is required")]
    MissingFeedUrl { feed: String },

    #[error("feed `{feed}`: instance is required")]
    MissingInstance { feed: String },

    #[error("feed `{feed}`: client_id is required")]
    MissingClientId { feed: String },

    #[error("feed `{feed}`: client_secret is required")]
    MissingClientSecret { feed: String },

    #[error("feed `{feed}`: access_token is required")]
    MissingAccessToken { feed: String },

    #[error("feed `{feed}`: {field} is not a valid URL ({reason})")]
    InvalidUrl {
        feed: String,
        field: &'static str,
        reason: String,
    },

    #[error("feed `{feed}`: invalid {field}: {reason}")]
    InvalidValue {
        feed: String,
        field: &'static str,
        reason: String,
    },

    #[error("environment variable {var} is not set")]
    MissingEnv { var: String },
}

/// Failure to obtain a usable feed document. Fatal for the run, state untouched.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("fetching feed {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("feed {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("parsing feed {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Outcome of one failed status post. Recorded, logged, never aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("instance rejected credentials (HTTP {status})")]
    Auth { status: u16 },

    #[error("rate limited by instance (reset: {})", reset.as_deref().unwrap_or("unknown"))]
    RateLimited { reset: Option<String> },

    #[error("posting status: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("instance answered HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected response from instance: {0}")]
    InvalidResponse(String),

    #[error("dispatch task failed: {0}")]
    Task(String),
}

/// Watermark persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Everything that makes a whole run fail.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("loading watermark: {0}")]
    LoadState(#[source] StateError),

    #[error("{sent} post(s) sent but the watermark was not saved: {source}")]
    SaveState {
        sent: usize,
        #[source]
        source: StateError,
    },
}

impl PublishError {
    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Auth { .. } => "auth",
            PublishError::RateLimited { .. } => "rate_limited",
            PublishError::Transport(_) => "transport",
            PublishError::Rejected { .. } => "rejected",
            PublishError::InvalidResponse(_) => "invalid_response",
            PublishError::Task(_) => "task",
        }
    }
}
