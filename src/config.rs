// src/config.rs
//! Feed registry: which feeds exist, where they are, and where their posts go.
//!
//! TOML or JSON. Credential fields may hold the literal `ENV`, which resolves to
//! `MASTOPOST_<FEED>_<FIELD>` (e.g. `MASTOPOST_RUST_BLOG_ACCESS_TOKEN`).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "MASTOPOST_CONFIG";
pub const DEFAULT_STATE_FILE: &str = "state/mastopost.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const FALLBACK_PATHS: [&str; 3] = ["mastopost.toml", "config/mastopost.toml", "mastopost.json"];
const VISIBILITIES: [&str; 4] = ["public", "unlisted", "private", "direct"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Upper bound on concurrent status posts; unbounded when absent.
    #[serde(default)]
    pub max_concurrent_posts: Option<usize>,
    #[serde(default)]
    pub feeds: BTreeMap<String, FeedConfig>,
}

/// One `[feeds.<name>]` table as written. Everything is optional here so that
/// validation can name the exact missing field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    pub feed_url: Option<String>,
    pub instance: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub visibility: Option<String>,
    pub state_file: Option<PathBuf>,
}

/// Validated settings for one feed.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub name: String,
    pub feed_url: Url,
    pub state_file: PathBuf,
    pub publisher: PublisherSettings,
}

#[derive(Clone)]
pub struct PublisherSettings {
    /// Feed these settings belong to; used to name the feed in errors.
    pub feed: String,
    pub instance: Url,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub visibility: Option<String>,
    pub timeout_secs: u64,
}

// Secrets stay out of logs.
impl fmt::Debug for PublisherSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherSettings")
            .field("feed", &self.feed)
            .field("instance", &self.instance.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("visibility", &self.visibility)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, &ext).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Load using, in order: `explicit`, $MASTOPOST_CONFIG, then the fallback paths.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from(Path::new(&p));
        }
        for p in FALLBACK_PATHS {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Err(ConfigError::NoConfigFile {
            tried: FALLBACK_PATHS.join(", "),
        })
    }

    /// Parse TOML or JSON. `hint_ext` picks the first attempt.
    pub fn parse(s: &str, hint_ext: &str) -> Result<Self, String> {
        if hint_ext == "json" {
            return serde_json::from_str(s).map_err(|e| e.to_string());
        }
        match toml::from_str::<Config>(s) {
            Ok(cfg) => Ok(cfg),
            Err(toml_err) => {
                if hint_ext == "toml" {
                    return Err(toml_err.to_string());
                }
                serde_json::from_str(s).map_err(|_| toml_err.to_string())
            }
        }
    }

    pub fn feed_names(&self) -> impl Iterator<Item = &str> {
        self.feeds.keys().map(String::as_str)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Registry lookup plus validation. Performs no network or state I/O.
    pub fn feed(&self, name: &str) -> Result<FeedSettings, ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MissingFeedName);
        }
        let fc = self
            .feeds
            .get(name)
            .ok_or_else(|| ConfigError::FeedNotFound(name.to_string()))?;
        let feed = || name.to_string();

        let feed_url = resolve(name, "feed_url", fc.feed_url.as_deref())?
            .ok_or_else(|| ConfigError::MissingFeedUrl { feed: feed() })?;
        let feed_url = parse_url(name, "feed_url", &feed_url)?;

        let instance = resolve(name, "instance", fc.instance.as_deref())?
            .ok_or_else(|| ConfigError::MissingInstance { feed: feed() })?;
        let instance = parse_url(name, "instance", &instance)?;

        let client_id = resolve(name, "client_id", fc.client_id.as_deref())?
            .ok_or_else(|| ConfigError::MissingClientId { feed: feed() })?;
        let client_secret = resolve(name, "client_secret", fc.client_secret.as_deref())?
            .ok_or_else(|| ConfigError::MissingClientSecret { feed: feed() })?;
        let access_token = resolve(name, "access_token", fc.access_token.as_deref())?
            .ok_or_else(|| ConfigError::MissingAccessToken { feed: feed() })?;

        let visibility = match fc.visibility.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(v) => {
                let v = v.to_ascii_lowercase();
                if !VISIBILITIES.contains(&v.as_str()) {
                    return Err(ConfigError::InvalidValue {
                        feed: feed(),
                        field: "visibility",
                        reason: format!("`{v}` is not one of {}", VISIBILITIES.join(", ")),
                    });
                }
                Some(v)
            }
        };

        let state_file = self.state_file_of(fc);

        Ok(FeedSettings {
            name: name.to_string(),
            feed_url,
            state_file,
            publisher: PublisherSettings {
                feed: name.to_string(),
                instance,
                client_id,
                client_secret,
                access_token,
                visibility,
                timeout_secs: self.timeout_secs(),
            },
        })
    }

    /// Where a feed's watermark lives. Needs no credentials.
    pub fn state_file_for(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let fc = self
            .feeds
            .get(name.trim())
            .ok_or_else(|| ConfigError::FeedNotFound(name.trim().to_string()))?;
        Ok(self.state_file_of(fc))
    }

    fn state_file_of(&self, fc: &FeedConfig) -> PathBuf {
        fc.state_file
            .clone()
            .or_else(|| self.state_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
    }
}

/// `MASTOPOST_<FEED>_<FIELD>`, feed upper-cased with separators mapped to `_`.
pub fn env_var_name(feed: &str, field: &str) -> String {
    let feed: String = feed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("MASTOPOST_{}_{}", feed, field.to_ascii_uppercase())
}

// Empty counts as missing; "ENV" reads the per-feed environment variable.
fn resolve(feed: &str, field: &str, raw: Option<&str>) -> Result<Option<String>, ConfigError> {
    let Some(v) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if !v.eq_ignore_ascii_case("env") {
        return Ok(Some(v.to_string()));
    }
    let var = env_var_name(feed, field);
    match std::env::var(&var) {
        Ok(val) if !val.trim().is_empty() => Ok(Some(val.trim().to_string())),
        _ => Err(ConfigError::MissingEnv { var }),
    }
}

fn parse_url(feed: &str, field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        feed: feed.to_string(),
        field,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            feed: feed.to_string(),
            field,
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }
    Ok(url)
}
