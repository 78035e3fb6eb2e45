// src/delta.rs
//! # Delta Selector
//! Pure logic that decides which entries of a snapshot are new against a feed's
//! two watermarks, and what the watermarks become afterwards. No I/O.
//!
//! Rules:
//! - feed-level: a snapshot not newer than `last_updated` means "no updates" (also covers
//!   feeds whose clock went backwards);
//! - entry-level: an entry is new iff `published_at > last_published` (strict, so the
//!   boundary item is never posted twice);
//! - every entry is inspected, feeds are not assumed to be sorted.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::{FeedSnapshot, NormalizedEntry};

/// Fixed "never seen" marker: 1980-01-01T00:00:00Z.
pub fn epoch_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedWatermark {
    pub feed_name: String,
    pub last_updated: DateTime<Utc>,
    pub last_published: DateTime<Utc>,
}

impl FeedWatermark {
    /// Watermark for a feed that has never run: every existing entry counts as new.
    pub fn fresh(feed_name: impl Into<String>) -> Self {
        Self {
            feed_name: feed_name.into(),
            last_updated: epoch_sentinel(),
            last_published: epoch_sentinel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub entries: Vec<NormalizedEntry>,
    pub watermark: FeedWatermark,
    /// False when the feed reported nothing newer than the stored `last_updated`.
    pub feed_updated: bool,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn select(snapshot: FeedSnapshot, watermark: &FeedWatermark) -> Selection {
    if snapshot.feed_updated_at <= watermark.last_updated {
        return Selection {
            entries: Vec::new(),
            watermark: watermark.clone(),
            feed_updated: false,
        };
    }

    let mut updated = watermark.clone();
    updated.last_updated = snapshot.feed_updated_at;

    let mut newest: Option<DateTime<Utc>> = None;
    let mut entries = Vec::new();
    for entry in snapshot.entries {
        if entry.published_at > watermark.last_published {
            newest = Some(newest.map_or(entry.published_at, |n| n.max(entry.published_at)));
            entries.push(entry);
        }
    }

    if let Some(newest) = newest {
        updated.last_published = newest;
    }

    Selection {
        entries,
        watermark: updated,
        feed_updated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(link: &str, at: DateTime<Utc>) -> NormalizedEntry {
        NormalizedEntry {
            title: link.to_string(),
            link: link.to_string(),
            published_at: at,
            author: None,
            categories: Vec::new(),
        }
    }

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    #[test]
    fn sentinel_is_1980() {
        assert_eq!(epoch_sentinel().to_rfc3339(), "1980-01-01T00:00:00+00:00");
    }

    #[test]
    fn equal_feed_update_is_no_update() {
        let wm = FeedWatermark {
            feed_name: "f".into(),
            last_updated: t(5),
            last_published: t(1),
        };
        let snap = FeedSnapshot {
            title: String::new(),
            feed_updated_at: t(5),
            entries: vec![entry("a", t(4))],
        };
        let sel = select(snap, &wm);
        assert!(!sel.feed_updated);
        assert!(sel.is_empty());
        assert_eq!(sel.watermark, wm);
    }

    #[test]
    fn feed_update_without_new_entries_moves_only_last_updated() {
        let wm = FeedWatermark {
            feed_name: "f".into(),
            last_updated: t(5),
            last_published: t(4),
        };
        let snap = FeedSnapshot {
            title: String::new(),
            feed_updated_at: t(6),
            entries: vec![entry("a", t(4)), entry("b", t(2))],
        };
        let sel = select(snap, &wm);
        assert!(sel.feed_updated);
        assert!(sel.is_empty());
        assert_eq!(sel.watermark.last_updated, t(6));
        assert_eq!(sel.watermark.last_published, t(4));
    }
}
