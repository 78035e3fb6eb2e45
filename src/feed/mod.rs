// src/feed/mod.rs
//! Feed reader: fetch a document over HTTP and normalize it into a `FeedSnapshot`.
//!
//! RSS 2.0 and Atom 1.0 are parsed behind `parse_document`, chosen by the root element.
//! Entries that cannot be ordered (no parseable publish time) or linked (no link) are
//! dropped here, so everything downstream can rely on both being present.

pub mod atom;
pub mod rss;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::delta::epoch_sentinel;
use crate::error::FeedError;
use crate::telemetry::{
    ensure_metrics_described, FEED_ENTRIES, FEED_ENTRIES_SKIPPED, FEED_FETCH_ERRORS,
    FEED_PARSE_MS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub author: Option<Author>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub title: String,
    pub feed_updated_at: DateTime<Utc>,
    /// Source order; not sorted by publish time.
    pub entries: Vec<NormalizedEntry>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FeedSnapshot, FeedError>;
}

/// Entry as it comes out of a format-specific parser, before validation.
#[derive(Debug, Default)]
pub(crate) struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub author: Option<Author>,
    pub categories: Vec<String>,
}

/// Feed as it comes out of a format-specific parser, before validation.
#[derive(Debug, Default)]
pub(crate) struct RawFeed {
    pub title: Option<String>,
    pub updated: Option<String>,
    pub entries: Vec<RawEntry>,
}

pub struct HttpFeedReader {
    client: Client,
    timeout: Duration,
}

impl HttpFeedReader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait]
impl FeedSource for HttpFeedReader {
    async fn fetch(&self, url: &Url) -> Result<FeedSnapshot, FeedError> {
        ensure_metrics_described();

        let rsp = match self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(rsp) => rsp,
            Err(e) => {
                counter!(FEED_FETCH_ERRORS).increment(1);
                return Err(FeedError::Fetch {
                    url: url.to_string(),
                    source: e,
                });
            }
        };

        let status = rsp.status();
        if !status.is_success() {
            counter!(FEED_FETCH_ERRORS).increment(1);
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = rsp.text().await.map_err(|e| {
            counter!(FEED_FETCH_ERRORS).increment(1);
            FeedError::Fetch {
                url: url.to_string(),
                source: e,
            }
        })?;

        let snapshot = parse_document(url.as_str(), &body).inspect_err(|_| {
            counter!(FEED_FETCH_ERRORS).increment(1);
        })?;

        tracing::info!(
            url = %url,
            title = %snapshot.title,
            updated = %snapshot.feed_updated_at,
            items = snapshot.entries.len(),
            "parsed feed"
        );
        Ok(snapshot)
    }
}

/// Parse an RSS or Atom document into a normalized snapshot.
pub fn parse_document(url: &str, body: &str) -> Result<FeedSnapshot, FeedError> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(body);

    let parse_err = |reason: String| FeedError::Parse {
        url: url.to_string(),
        reason,
    };

    let raw = match root_element(&xml).as_deref() {
        Some("rss") => rss::parse(&xml).map_err(parse_err)?,
        Some("feed") => atom::parse(&xml).map_err(parse_err)?,
        Some(other) => return Err(parse_err(format!("unsupported root element <{other}>"))),
        None => return Err(parse_err("not an XML document".to_string())),
    };

    let snapshot = normalize(raw);

    histogram!(FEED_PARSE_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!(FEED_ENTRIES).increment(snapshot.entries.len() as u64);
    Ok(snapshot)
}

fn normalize(raw: RawFeed) -> FeedSnapshot {
    let mut entries = Vec::with_capacity(raw.entries.len());
    let mut skipped = 0u64;

    for it in raw.entries {
        let link = it.link.map(|l| l.trim().to_string()).unwrap_or_default();
        let published_at = it.published.as_deref().and_then(parse_timestamp);

        let Some(published_at) = published_at.filter(|_| !link.is_empty()) else {
            tracing::debug!(
                title = it.title.as_deref().unwrap_or_default(),
                published = it.published.as_deref().unwrap_or_default(),
                "skipping entry without link or publish time"
            );
            skipped += 1;
            continue;
        };

        entries.push(NormalizedEntry {
            title: normalize_text(it.title.as_deref().unwrap_or_default()),
            link,
            published_at,
            author: it.author.and_then(clean_author),
            categories: it
                .categories
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        });
    }

    if skipped > 0 {
        counter!(FEED_ENTRIES_SKIPPED).increment(skipped);
    }

    // Feeds that do not state an update time fall back to their newest entry.
    let feed_updated_at = raw
        .updated
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| entries.iter().map(|e| e.published_at).max())
        .unwrap_or_else(epoch_sentinel);

    FeedSnapshot {
        title: normalize_text(raw.title.as_deref().unwrap_or_default()),
        feed_updated_at,
        entries,
    }
}

fn clean_author(a: Author) -> Option<Author> {
    let tidy = |s: Option<String>| {
        s.map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let author = Author {
        name: tidy(a.name),
        email: tidy(a.email),
    };
    if author.name.is_none() && author.email.is_none() {
        None
    } else {
        Some(author)
    }
}

/// Parse feed timestamps: RFC 2822, then RFC 3339, then chrono's more lenient RFC 2822.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let stripped = re_tags.replace_all(&decoded, "");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

// HTML entities that real-world feeds use but XML does not define.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&hellip;", "&#8230;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_accept_rfc2822_and_rfc3339() {
        let want = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("Fri, 01 Mar 2024 12:00:00 +0000"), Some(want));
        assert_eq!(parse_timestamp("2024-03-01T13:00:00+01:00"), Some(want));
        assert_eq!(parse_timestamp("  "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn normalize_text_decodes_and_collapses() {
        assert_eq!(
            normalize_text("  <b>Rust&amp;Go</b>\n   released  "),
            "Rust&Go released"
        );
    }

    #[test]
    fn root_element_is_detected() {
        assert_eq!(
            root_element("<?xml version=\"1.0\"?><rss version=\"2.0\"></rss>").as_deref(),
            Some("rss")
        );
        assert_eq!(
            root_element("<feed xmlns=\"http://www.w3.org/2005/Atom\"/>").as_deref(),
            Some("feed")
        );
        assert_eq!(root_element("plain text"), None);
    }

    #[test]
    fn feed_without_update_time_uses_newest_entry() {
        let raw = RawFeed {
            title: Some("t".into()),
            updated: None,
            entries: vec![
                RawEntry {
                    link: Some("https://x/1".into()),
                    published: Some("2024-01-01T00:00:00Z".into()),
                    ..Default::default()
                },
                RawEntry {
                    link: Some("https://x/2".into()),
                    published: Some("2024-02-01T00:00:00Z".into()),
                    ..Default::default()
                },
            ],
        };
        let snap = normalize(raw);
        assert_eq!(
            snap.feed_updated_at,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_feed_without_dates_reads_as_epoch() {
        let snap = normalize(RawFeed::default());
        assert_eq!(snap.feed_updated_at, epoch_sentinel());
        assert!(snap.entries.is_empty());
    }
}
