// src/run.rs
//! Run orchestrator: one pass for one feed.
//!
//! load watermark → fetch → select → (dispatch) → save. Fetch and load failures end the
//! run with the watermark untouched. Once anything was dispatched the watermark advances
//! unconditionally, so a failed post is not retried on the next run.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use reqwest::{Client, Url};

use crate::config::{Config, FeedSettings};
use crate::delta::{select, FeedWatermark};
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, RunError};
use crate::feed::{FeedSource, HttpFeedReader};
use crate::publish::MastodonClient;
use crate::state::{JsonFileStore, WatermarkStore};
use crate::telemetry::{
    ensure_metrics_described, DELTA_NEW_ENTRIES, RUN_LAST_TS, WATERMARK_SAVE_ERRORS,
};

const USER_AGENT: &str = concat!("mastopost/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Feed reported nothing newer than the stored `last_updated`.
    NoUpdates,
    /// Feed changed but no entry is newer than `last_published`.
    NoNewEntries,
    /// Dry run: this many entries would have been posted.
    DryRun { pending: usize },
    Dispatched { sent: usize, failed: usize },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub feed_name: String,
    pub status: RunStatus,
    /// Watermark as it stands after the run (persisted unless dry run).
    pub watermark: FeedWatermark,
}

impl RunReport {
    pub fn posts_sent(&self) -> usize {
        match self.status {
            RunStatus::Dispatched { sent, .. } => sent,
            _ => 0,
        }
    }
}

pub struct Runner {
    store: Arc<dyn WatermarkStore>,
    reader: Arc<dyn FeedSource>,
    dispatcher: Dispatcher,
}

impl Runner {
    pub fn new(
        store: Arc<dyn WatermarkStore>,
        reader: Arc<dyn FeedSource>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            store,
            reader,
            dispatcher,
        }
    }

    /// Wire the HTTP reader, the Mastodon client and the JSON state file for one feed.
    pub fn from_config(config: &Config, settings: &FeedSettings) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                feed: settings.name.clone(),
                field: "http client",
                reason: e.to_string(),
            })?;

        let publisher = MastodonClient::new(&settings.publisher, client.clone())?;
        let reader = HttpFeedReader::new(client).with_timeout(config.timeout_secs());
        let store = JsonFileStore::new(settings.state_file.clone());
        let dispatcher =
            Dispatcher::new(Arc::new(publisher)).with_limit(config.max_concurrent_posts);

        Ok(Self::new(Arc::new(store), Arc::new(reader), dispatcher))
    }

    pub async fn run_once(
        &self,
        feed_name: &str,
        feed_url: &Url,
        dry_run: bool,
    ) -> Result<RunReport, RunError> {
        let feed_name = feed_name.trim();
        if feed_name.is_empty() {
            return Err(ConfigError::MissingFeedName.into());
        }
        ensure_metrics_described();

        let stored = self
            .store
            .load(feed_name)
            .await
            .map_err(RunError::LoadState)?;

        let snapshot = self.reader.fetch(feed_url).await?;
        let selection = select(snapshot, &stored);
        let changed = selection.watermark != stored;

        if selection.is_empty() {
            let status = if selection.feed_updated {
                RunStatus::NoNewEntries
            } else {
                RunStatus::NoUpdates
            };
            tracing::info!(
                feed = %feed_name,
                last_updated = %stored.last_updated,
                status = ?status,
                "nothing new to post"
            );
            if changed && !dry_run {
                self.store
                    .save(&selection.watermark)
                    .await
                    .map_err(|source| RunError::SaveState { sent: 0, source })?;
            }
            return Ok(self.finish(feed_name, status, selection.watermark));
        }

        counter!(DELTA_NEW_ENTRIES).increment(selection.entries.len() as u64);

        if dry_run {
            for entry in &selection.entries {
                tracing::info!(
                    feed = %feed_name,
                    title = %entry.title,
                    link = %entry.link,
                    published = %entry.published_at,
                    "dry run: would post"
                );
            }
            let status = RunStatus::DryRun {
                pending: selection.entries.len(),
            };
            return Ok(self.finish(feed_name, status, selection.watermark));
        }

        tracing::info!(
            feed = %feed_name,
            new = selection.entries.len(),
            destination = %self.dispatcher.destination(),
            "dispatching new entries"
        );
        let report = self.dispatcher.dispatch_all(selection.entries).await;
        let (sent, failed) = (report.sent(), report.failed());

        if let Err(source) = self.store.save(&selection.watermark).await {
            counter!(WATERMARK_SAVE_ERRORS).increment(1);
            tracing::error!(
                feed = %feed_name,
                sent,
                error = %source,
                "watermark not saved after posting; the next run will post these entries again"
            );
            return Err(RunError::SaveState { sent, source });
        }

        tracing::info!(
            feed = %feed_name,
            sent,
            failed,
            last_updated = %selection.watermark.last_updated,
            last_published = %selection.watermark.last_published,
            "run complete"
        );
        Ok(self.finish(
            feed_name,
            RunStatus::Dispatched { sent, failed },
            selection.watermark,
        ))
    }

    fn finish(&self, feed_name: &str, status: RunStatus, watermark: FeedWatermark) -> RunReport {
        gauge!(RUN_LAST_TS).set(chrono::Utc::now().timestamp() as f64);
        RunReport {
            feed_name: feed_name.to_string(),
            status,
            watermark,
        }
    }
}
