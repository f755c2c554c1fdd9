//! End-to-end ingestion through an in-process feed and a channel sink.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures_util::stream;
use serde_json::json;
use thingmodel_schema::LatLng;
use thingmodel_sink::SinkHandle;
use thingmodel_tweets::error::EventError;
use thingmodel_tweets::feed::{ChannelFeed, HttpStreamFeed};
use thingmodel_tweets::ingest::{EventOutcome, TweetAdapter, TWEET_TYPE};
use thingmodel_tweets::tweet::ControlKind;
use thingmodel_warehouse::{RegisterOutcome, Warehouse};
use tokio::sync::watch;

fn geo_tweet(id: u64, text: &str) -> String {
    json!({
        "id": id,
        "text": text,
        "created_at": "Mon Jan 01 00:00:00 +0000 2024",
        "user": { "name": "Alice", "screen_name": "alice" },
        "coordinates": { "type": "Point", "coordinates": [-0.12, 51.5] },
        "geo": { "type": "Point", "coordinates": [51.5, -0.12] }
    })
    .to_string()
}

fn plain_tweet(id: u64) -> String {
    json!({
        "id": id,
        "text": "no position",
        "created_at": "Mon Jan 01 00:00:00 +0000 2024",
        "user": { "name": "Bob" },
        "coordinates": null,
        "geo": null
    })
    .to_string()
}

fn new_adapter(
    queue: usize,
) -> (
    TweetAdapter<SinkHandle>,
    tokio::sync::mpsc::Receiver<Arc<thingmodel_schema::Thing>>,
) {
    let warehouse = Arc::new(Warehouse::new());
    let (sink, rx) = SinkHandle::channel("TweeterAdapter", queue);
    let adapter = TweetAdapter::new(warehouse, sink).expect("adapter should start");
    (adapter, rx)
}

// ── Line processing ─────────────────────────────────────────────────

#[test]
fn geo_tagged_tweet_becomes_a_thing() {
    let (adapter, _rx) = new_adapter(8);

    let outcome = adapter.handle_line(&geo_tweet(42, "hello"));
    assert_eq!(
        outcome,
        Some(EventOutcome::Registered {
            thing_id: "tweet:42".to_string(),
            outcome: RegisterOutcome::Inserted,
        })
    );

    let thing = adapter
        .warehouse()
        .lookup("tweet:42")
        .expect("tweet should be stored");
    assert_eq!(thing.type_name(), TWEET_TYPE);
    assert_eq!(thing.location(), Some(LatLng::new(51.5, -0.12)));
    assert_eq!(thing.string("author"), Some("Alice"));
    assert_eq!(thing.string("content"), Some("hello"));
    assert_eq!(
        thing.date_time("date"),
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn tweet_type_is_defined_on_startup() {
    let (adapter, _rx) = new_adapter(8);
    let tweet = adapter
        .warehouse()
        .thing_type(TWEET_TYPE)
        .expect("tweet type should be defined");
    let names: Vec<&str> = tweet.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["location", "author", "date", "content"]);
}

#[test]
fn tweet_without_position_is_skipped() {
    let (adapter, mut rx) = new_adapter(8);

    assert_eq!(
        adapter.handle_line(&plain_tweet(7)),
        Some(EventOutcome::SkippedWithoutLocation)
    );
    assert!(adapter.warehouse().is_empty());
    assert!(rx.try_recv().is_err());

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.skipped_without_location, 1);
    assert_eq!(stats.registered, 0);
}

#[test]
fn malformed_line_is_counted_and_processing_continues() {
    let (adapter, _rx) = new_adapter(8);

    assert_eq!(adapter.handle_line("{not json"), None);
    assert!(adapter.handle_line(&geo_tweet(1, "after")).is_some());

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.registered, 1);
    assert!(adapter.warehouse().contains("tweet:1"));
}

#[test]
fn bad_timestamp_is_an_event_error() {
    let (adapter, _rx) = new_adapter(8);
    let line = geo_tweet(3, "x").replace("Mon Jan 01 00:00:00 +0000 2024", "yesterday");

    let err = adapter.process_line(&line).unwrap_err();
    assert!(matches!(err, EventError::InvalidTimestamp(ref raw) if raw == "yesterday"));
    assert!(adapter.warehouse().is_empty());
}

#[test]
fn out_of_range_position_is_rejected() {
    let (adapter, _rx) = new_adapter(8);
    let line = json!({
        "id": 5,
        "text": "x",
        "created_at": "Mon Jan 01 00:00:00 +0000 2024",
        "user": { "name": "Alice" },
        "coordinates": { "type": "Point", "coordinates": [0.0, 123.0] }
    })
    .to_string();

    let err = adapter.process_line(&line).unwrap_err();
    assert!(matches!(err, EventError::InvalidLocation(_)));
}

#[test]
fn control_messages_are_counted_not_stored() {
    let (adapter, _rx) = new_adapter(8);

    let delete = json!({ "delete": { "status": { "id": 1 } } }).to_string();
    let limit = json!({ "limit": { "track": 10 } }).to_string();
    assert_eq!(
        adapter.handle_line(&delete),
        Some(EventOutcome::Control(ControlKind::Delete))
    );
    assert_eq!(
        adapter.handle_line(&limit),
        Some(EventOutcome::Control(ControlKind::Limit))
    );

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.control, 2);
    assert_eq!(stats.received, 2);
    assert!(adapter.warehouse().is_empty());
}

#[test]
fn blank_lines_are_not_counted() {
    let (adapter, _rx) = new_adapter(8);

    assert_eq!(adapter.handle_line("  \r"), Some(EventOutcome::KeepAlive));
    assert_eq!(adapter.stats().snapshot().received, 0);
}

// ── Sink notification ───────────────────────────────────────────────

#[test]
fn registered_tweet_is_sent_to_the_sink() {
    let (adapter, mut rx) = new_adapter(8);

    adapter.handle_line(&geo_tweet(42, "hello"));
    let sent = rx.try_recv().expect("sink should have been notified");
    assert_eq!(sent.id(), "tweet:42");
    assert_eq!(sent.string("content"), Some("hello"));
}

#[test]
fn identical_tweet_is_not_sent_twice() {
    let (adapter, mut rx) = new_adapter(8);

    adapter.handle_line(&geo_tweet(42, "hello"));
    let second = adapter.handle_line(&geo_tweet(42, "hello"));
    assert_eq!(
        second,
        Some(EventOutcome::Registered {
            thing_id: "tweet:42".to_string(),
            outcome: RegisterOutcome::Unchanged,
        })
    );

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.registered, 1);
    assert_eq!(stats.unchanged, 1);
}

#[test]
fn edited_tweet_replaces_and_is_sent_again() {
    let (adapter, mut rx) = new_adapter(8);

    adapter.handle_line(&geo_tweet(42, "hello"));
    let second = adapter.handle_line(&geo_tweet(42, "hello, edited"));
    assert!(matches!(
        second,
        Some(EventOutcome::Registered {
            outcome: RegisterOutcome::Replaced,
            ..
        })
    ));

    assert_eq!(adapter.warehouse().len(), 1);
    let stored = adapter.warehouse().lookup("tweet:42").expect("stored");
    assert_eq!(stored.string("content"), Some("hello, edited"));
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_ok());
}

#[test]
fn full_sink_queue_does_not_block_registration() {
    let (adapter, _rx) = new_adapter(1);

    for id in 0..5 {
        adapter.handle_line(&geo_tweet(id, "burst"));
    }

    assert_eq!(adapter.warehouse().len(), 5);
    assert_eq!(adapter.stats().snapshot().registered, 5);
}

// ── Run loop ────────────────────────────────────────────────────────

#[tokio::test]
async fn run_consumes_feed_until_it_ends() {
    let (adapter, _rx) = new_adapter(16);
    let (tx, mut feed) = ChannelFeed::new(16);
    let (_stop_tx, stop_rx) = watch::channel(false);

    tx.send(geo_tweet(1, "one")).await.expect("send should succeed");
    tx.send(plain_tweet(2)).await.expect("send should succeed");
    tx.send("garbage".to_string())
        .await
        .expect("send should succeed");
    tx.send(geo_tweet(3, "three")).await.expect("send should succeed");
    drop(tx);

    adapter
        .run(&mut feed, stop_rx)
        .await
        .expect("run should end cleanly");

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.registered, 2);
    assert_eq!(stats.skipped_without_location, 1);
    assert_eq!(stats.failed, 1);

    let mut ids = adapter.warehouse().ids();
    ids.sort();
    assert_eq!(ids, vec!["tweet:1", "tweet:3"]);
}

#[tokio::test]
async fn run_returns_immediately_when_already_stopped() {
    let (adapter, _rx) = new_adapter(16);
    let (tx, mut feed) = ChannelFeed::new(16);
    let (_stop_tx, stop_rx) = watch::channel(true);

    tx.send(geo_tweet(1, "never read"))
        .await
        .expect("send should succeed");

    adapter
        .run(&mut feed, stop_rx)
        .await
        .expect("run should end cleanly");

    assert_eq!(adapter.stats().snapshot().received, 0);
    assert!(adapter.warehouse().is_empty());
}

#[tokio::test]
async fn stop_signal_ends_an_idle_run() {
    let (adapter, _rx) = new_adapter(16);
    let (tx, mut feed) = ChannelFeed::new(16);
    let (stop_tx, stop_rx) = watch::channel(false);

    tx.send(geo_tweet(1, "first"))
        .await
        .expect("send should succeed");

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        stop_tx.send_replace(true);
    });

    // The sender stays open, so only the stop signal can end the run.
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        adapter.run(&mut feed, stop_rx),
    )
    .await
    .expect("run should observe the stop signal")
    .expect("run should end cleanly");
    stopper.await.expect("task should not panic");

    assert_eq!(adapter.stats().snapshot().registered, 1);
    drop(tx);
}

#[tokio::test]
async fn unreadable_line_does_not_end_the_run() {
    let (adapter, _rx) = new_adapter(16);
    let chunks = vec![
        format!("{}\n", geo_tweet(1, "before")).into_bytes(),
        vec![0xff, 0xfe, b'\n'],
        format!("{}\n", geo_tweet(2, "after")).into_bytes(),
    ];
    let mut feed = HttpStreamFeed::from_chunks(stream::iter(
        chunks.into_iter().map(Ok::<_, reqwest::Error>),
    ));
    let (_stop_tx, stop_rx) = watch::channel(false);

    adapter
        .run(&mut feed, stop_rx)
        .await
        .expect("a bad line should not end the run");

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.registered, 2);
    assert_eq!(stats.failed, 1);

    let mut ids = adapter.warehouse().ids();
    ids.sort();
    assert_eq!(ids, vec!["tweet:1", "tweet:2"]);
}

#[tokio::test]
async fn overlong_line_does_not_end_the_run() {
    let (adapter, _rx) = new_adapter(16);
    let tweet = geo_tweet(7, "fits");
    let chunks = vec![
        vec![b'x'; tweet.len() * 3],
        format!("\n{}\n", tweet).into_bytes(),
    ];
    let mut feed = HttpStreamFeed::from_chunks(stream::iter(
        chunks.into_iter().map(Ok::<_, reqwest::Error>),
    ))
    .with_max_line(tweet.len());
    let (_stop_tx, stop_rx) = watch::channel(false);

    adapter
        .run(&mut feed, stop_rx)
        .await
        .expect("an overlong line should not end the run");

    let stats = adapter.stats().snapshot();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.registered, 1);
    assert!(adapter.warehouse().contains("tweet:7"));
}
