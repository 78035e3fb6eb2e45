// src/telemetry.rs
//! Tracing setup for the binary and metric series used across the pipeline.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG: &str = "MASTOPOST_LOG";

pub const FEED_FETCH_ERRORS: &str = "feed_fetch_errors_total";
pub const FEED_ENTRIES: &str = "feed_entries_total";
pub const FEED_ENTRIES_SKIPPED: &str = "feed_entries_skipped_total";
pub const FEED_PARSE_MS: &str = "feed_parse_ms";
pub const DELTA_NEW_ENTRIES: &str = "delta_new_entries_total";
pub const POSTS_PUBLISHED: &str = "posts_published_total";
pub const POSTS_FAILED: &str = "posts_failed_total";
pub const WATERMARK_SAVE_ERRORS: &str = "watermark_save_errors_total";
pub const RUN_LAST_TS: &str = "run_last_ts";

/// One-time metrics registration (so series carry descriptions once a recorder exists).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(FEED_FETCH_ERRORS, "Feed fetch/parse failures.");
        describe_counter!(FEED_ENTRIES, "Entries normalized from fetched feeds.");
        describe_counter!(
            FEED_ENTRIES_SKIPPED,
            "Entries dropped for lacking a link or a parseable publish time."
        );
        describe_histogram!(FEED_PARSE_MS, "Feed parse time in milliseconds.");
        describe_counter!(DELTA_NEW_ENTRIES, "Entries selected as new.");
        describe_counter!(POSTS_PUBLISHED, "Statuses accepted by the instance.");
        describe_counter!(POSTS_FAILED, "Statuses that failed to post.");
        describe_counter!(
            WATERMARK_SAVE_ERRORS,
            "Watermark saves that failed after dispatch."
        );
        describe_gauge!(RUN_LAST_TS, "Unix ts when a run last completed.");
    });
}

/// Install the global subscriber. `MASTOPOST_LOG` overrides the default `info` filter.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .with_env_var(ENV_LOG)
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
