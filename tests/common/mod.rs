// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mastopost::error::{FeedError, PublishError};
use mastopost::feed::{Author, FeedSnapshot, FeedSource, NormalizedEntry};
use mastopost::format::PostPayload;
use mastopost::publish::{PostId, Publisher};
use parking_lot::Mutex;
use reqwest::Url;

pub const FEED_URL: &str = "https://blog.example/feed.xml";

pub fn feed_url() -> Url {
    Url::parse(FEED_URL).unwrap()
}

/// 2024-03-01T00:00:00Z plus `h` hours.
pub fn at(h: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h)
}

pub fn entry(link: &str, published_at: DateTime<Utc>) -> NormalizedEntry {
    NormalizedEntry {
        title: format!("Title of {link}"),
        link: link.to_string(),
        published_at,
        author: Some(Author {
            name: Some("Alice".into()),
            email: None,
        }),
        categories: vec!["tech-news".into()],
    }
}

pub fn snapshot(updated: DateTime<Utc>, entries: Vec<NormalizedEntry>) -> FeedSnapshot {
    FeedSnapshot {
        title: "Example".into(),
        feed_updated_at: updated,
        entries,
    }
}

/// Feed source that always returns the same snapshot (or the same failure).
pub struct FixedFeed {
    snapshot: Option<FeedSnapshot>,
    pub fetches: AtomicUsize,
}

impl FixedFeed {
    pub fn new(snapshot: FeedSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            snapshot: None,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeedSource for FixedFeed {
    async fn fetch(&self, url: &Url) -> Result<FeedSnapshot, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.snapshot.clone().ok_or_else(|| FeedError::Status {
            url: url.to_string(),
            status: 503,
        })
    }
}

/// Publisher that records every payload and fails for selected links.
#[derive(Default)]
pub struct RecordingPublisher {
    pub posted: Mutex<Vec<PostPayload>>,
    fail_links: HashSet<String>,
    panic_links: HashSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, link: &str) -> Self {
        self.fail_links.insert(link.to_string());
        self
    }

    pub fn panicking_on(mut self, link: &str) -> Self {
        self.panic_links.insert(link.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn statuses(&self) -> Vec<String> {
        self.posted.lock().iter().map(|p| p.status.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.posted.lock().len()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn post(&self, payload: &PostPayload) -> Result<PostId, PublishError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_links.iter().any(|l| payload.status.contains(l.as_str())) {
            panic!("publisher blew up");
        }
        if self.fail_links.iter().any(|l| payload.status.contains(l.as_str())) {
            return Err(PublishError::Rejected {
                status: 422,
                body: "validation failed".into(),
            });
        }

        let mut posted = self.posted.lock();
        posted.push(payload.clone());
        Ok(PostId(format!("id-{}", posted.len())))
    }

    fn destination(&self) -> String {
        "recording://test".into()
    }
}
