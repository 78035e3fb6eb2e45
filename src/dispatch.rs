// src/dispatch.rs
//! Dispatch coordinator: fan the selected entries out to the publisher, one task
//! each, and gather every outcome before returning.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::PublishError;
use crate::feed::NormalizedEntry;
use crate::format::format_post;
use crate::publish::{PostId, Publisher};
use crate::telemetry::{ensure_metrics_described, POSTS_FAILED, POSTS_PUBLISHED};

#[derive(Debug)]
pub struct DispatchOutcome {
    pub entry: NormalizedEntry,
    pub result: Result<PostId, PublishError>,
}

/// One outcome per submitted entry, in submission order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// `(succeeded, failed)`, each keeping submission order.
    pub fn partition(self) -> (Vec<DispatchOutcome>, Vec<DispatchOutcome>) {
        self.outcomes.into_iter().partition(|o| o.result.is_ok())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    publisher: Arc<dyn Publisher>,
    limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher,
            limit: None,
        }
    }

    /// Cap on in-flight posts. `None` or `0` leaves fan-out unbounded.
    pub fn with_limit(mut self, max_in_flight: Option<usize>) -> Self {
        self.limit = max_in_flight
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub fn destination(&self) -> String {
        self.publisher.destination()
    }

    /// Posts every entry concurrently. Never fails as a whole; each failure is
    /// logged and recorded in the report.
    pub async fn dispatch_all(&self, entries: Vec<NormalizedEntry>) -> DispatchReport {
        if entries.is_empty() {
            return DispatchReport::default();
        }
        ensure_metrics_described();

        let mut pending: Vec<(NormalizedEntry, JoinHandle<Result<PostId, PublishError>>)> =
            Vec::with_capacity(entries.len());

        for entry in entries {
            let payload = format_post(&entry);
            let publisher = Arc::clone(&self.publisher);
            let limit = self.limit.clone();
            let handle = tokio::spawn(async move {
                let _permit = match limit {
                    Some(sem) => Some(
                        sem.acquire_owned()
                            .await
                            .map_err(|e| PublishError::Task(e.to_string()))?,
                    ),
                    None => None,
                };
                publisher.post(&payload).await
            });
            pending.push((entry, handle));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (entry, handle) in pending {
            let result = match handle.await {
                Ok(r) => r,
                Err(join_err) => Err(PublishError::Task(join_err.to_string())),
            };

            match &result {
                Ok(id) => {
                    counter!(POSTS_PUBLISHED).increment(1);
                    tracing::info!(link = %entry.link, status_id = %id, "posted");
                }
                Err(e) => {
                    counter!(POSTS_FAILED).increment(1);
                    tracing::error!(
                        link = %entry.link,
                        kind = e.kind(),
                        error = %e,
                        "failed to post entry"
                    );
                }
            }
            outcomes.push(DispatchOutcome { entry, result });
        }

        DispatchReport { outcomes }
    }
}
