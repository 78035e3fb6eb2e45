// tests/dispatch_partial.rs
mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{at, entry, RecordingPublisher};
use mastopost::dispatch::Dispatcher;
use mastopost::error::PublishError;

#[tokio::test]
async fn empty_batch_returns_immediately() {
    let publisher = RecordingPublisher::new().arc();
    let report = Dispatcher::new(publisher.clone()).dispatch_all(Vec::new()).await;
    assert!(report.is_empty());
    assert_eq!(report.sent(), 0);
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn one_failure_does_not_stop_the_batch() {
    let publisher = RecordingPublisher::new().failing_on("https://x/b").arc();
    let entries = vec![
        entry("https://x/a", at(1)),
        entry("https://x/b", at(2)),
        entry("https://x/c", at(3)),
    ];

    let report = Dispatcher::new(publisher.clone()).dispatch_all(entries).await;

    assert_eq!(report.len(), 3);
    assert_eq!(report.sent(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(publisher.count(), 2);

    // outcomes come back in submission order
    let links: Vec<_> = report.outcomes.iter().map(|o| o.entry.link.as_str()).collect();
    assert_eq!(links, vec!["https://x/a", "https://x/b", "https://x/c"]);
    assert!(matches!(
        report.outcomes[1].result,
        Err(PublishError::Rejected { status: 422, .. })
    ));

    let (succeeded, failed) = report.partition();
    assert_eq!(succeeded.len(), 2);
    assert_eq!(failed[0].entry.link, "https://x/b");
}

#[tokio::test]
async fn panicking_post_is_reported_not_lost() {
    let publisher = RecordingPublisher::new().panicking_on("https://x/boom").arc();
    let entries = vec![entry("https://x/boom", at(1)), entry("https://x/fine", at(2))];

    let report = Dispatcher::new(publisher.clone()).dispatch_all(entries).await;

    assert_eq!(report.len(), 2);
    assert!(matches!(report.outcomes[0].result, Err(PublishError::Task(_))));
    assert!(report.outcomes[1].result.is_ok());
}

#[tokio::test]
async fn limit_bounds_in_flight_posts() {
    let publisher = RecordingPublisher::new()
        .with_delay(Duration::from_millis(20))
        .arc();
    let entries = (0..6)
        .map(|i| entry(&format!("https://x/item-{i}"), at(i)))
        .collect();

    let report = Dispatcher::new(publisher.clone())
        .with_limit(Some(2))
        .dispatch_all(entries)
        .await;

    assert_eq!(report.sent(), 6);
    assert!(publisher.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn unbounded_dispatch_runs_concurrently() {
    let publisher = Arc::new(RecordingPublisher::new().with_delay(Duration::from_millis(50)));
    let entries = (0..4)
        .map(|i| entry(&format!("https://x/item-{i}"), at(i)))
        .collect();

    let report = Dispatcher::new(publisher.clone()).dispatch_all(entries).await;

    assert_eq!(report.sent(), 4);
    assert!(publisher.max_in_flight.load(Ordering::SeqCst) > 1);
}
