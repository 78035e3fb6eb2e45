// tests/feed_parse.rs
use chrono::{TimeZone, Utc};
use mastopost::error::FeedError;
use mastopost::feed::parse_document;

const RSS: &str = include_str!("fixtures/rss_sample.xml");
const ATOM: &str = include_str!("fixtures/atom_sample.xml");
const PODCAST: &str = include_str!("fixtures/podcast_rss.xml");

#[test]
fn rss_fixture_normalizes() {
    let snap = parse_document("https://blog.example/feed.xml", RSS).unwrap();
    assert_eq!(snap.title, "Example Blog");
    assert_eq!(
        snap.feed_updated_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    );

    // entries without a link or a publish time are dropped
    assert_eq!(snap.entries.len(), 2);

    let first = &snap.entries[0];
    assert_eq!(first.title, "First & foremost");
    assert_eq!(first.link, "https://blog.example/first");
    let author = first.author.as_ref().unwrap();
    assert_eq!(author.name.as_deref(), Some("Alice"));
    assert_eq!(author.email.as_deref(), Some("alice@example.com"));
    assert_eq!(first.categories, vec!["tech-news", "rust"]);

    let second = &snap.entries[1];
    assert_eq!(second.title, "Second \u{2014} older");
    assert_eq!(
        second.published_at,
        Utc.with_ymd_and_hms(2024, 2, 28, 8, 0, 0).unwrap()
    );
    assert_eq!(
        second.author.as_ref().and_then(|a| a.name.as_deref()),
        Some("Bob")
    );
}

#[test]
fn podcast_feed_with_itunes_and_media_elements_parses() {
    let snap = parse_document("https://pod.example/feed.xml", PODCAST).unwrap();
    assert_eq!(snap.title, "Rust Hour");
    // no lastBuildDate, so the channel pubDate is used
    assert_eq!(
        snap.feed_updated_at,
        Utc.with_ymd_and_hms(2024, 3, 2, 6, 0, 0).unwrap()
    );
    assert_eq!(snap.entries.len(), 2);

    let ep2 = &snap.entries[0];
    assert_eq!(ep2.title, "Ep 2: Async");
    assert_eq!(ep2.link, "https://pod.example/ep2");
    assert_eq!(ep2.categories, vec!["async-rust"]);
    let author = ep2.author.as_ref().unwrap();
    assert_eq!(author.name.as_deref(), Some("Pat"));
    assert_eq!(author.email.as_deref(), Some("host@pod.example"));

    assert_eq!(snap.entries[1].title, "Ep 1: Ownership");
}

#[test]
fn atom_fixture_normalizes() {
    let snap = parse_document("https://atom.example/feed", ATOM).unwrap();
    assert_eq!(snap.title, "Example Atom");
    assert_eq!(
        snap.feed_updated_at,
        Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()
    );
    assert_eq!(snap.entries.len(), 2);

    let one = &snap.entries[0];
    // published wins over updated
    assert_eq!(
        one.published_at,
        Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap()
    );
    assert_eq!(one.link, "https://atom.example/one");
    assert_eq!(one.categories, vec!["open-source"]);
    let author = one.author.as_ref().unwrap();
    assert_eq!(author.name.as_deref(), Some("Carol"));
    assert_eq!(author.email.as_deref(), Some("carol@example.com"));

    let two = &snap.entries[1];
    assert_eq!(
        two.published_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap()
    );
    assert!(two.author.is_none());
}

#[test]
fn unsupported_and_broken_documents_are_parse_errors() {
    let err = parse_document("u", "<html><body>nope</body></html>").unwrap_err();
    assert!(matches!(err, FeedError::Parse { .. }));

    let err = parse_document("u", "not xml at all").unwrap_err();
    assert!(matches!(err, FeedError::Parse { .. }));
}
