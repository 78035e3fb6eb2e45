// src/publish/mod.rs
pub mod mastodon;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;
use crate::format::PostPayload;

pub use mastodon::MastodonClient;

/// Identifier the destination assigned to a published status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination for status posts. Shared across dispatch tasks, so it must be `Send + Sync`.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn post(&self, payload: &PostPayload) -> Result<PostId, PublishError>;

    /// Where posts go (for logs only).
    fn destination(&self) -> String;
}
