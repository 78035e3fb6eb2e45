// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod delta;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod format;
pub mod publish;
pub mod run;
pub mod scheduler;
pub mod state;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::{Config, FeedSettings};
pub use crate::delta::{epoch_sentinel, select, FeedWatermark, Selection};
pub use crate::dispatch::{DispatchReport, Dispatcher};
pub use crate::error::{ConfigError, FeedError, PublishError, RunError, StateError};
pub use crate::feed::{FeedSnapshot, FeedSource, HttpFeedReader, NormalizedEntry};
pub use crate::format::{format_post, PostPayload};
pub use crate::publish::{MastodonClient, PostId, Publisher};
pub use crate::run::{RunReport, RunStatus, Runner};
pub use crate::state::{JsonFileStore, MemoryStore, WatermarkStore};
