//! End-to-end publisher/consumer pipeline over the in-memory broker.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use filefeed::queue::{InMemoryBroker, QueueConsumer};
use filefeed::{DirectoryPublisher, FeedConsumer, FeedError};

fn dir_with(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        File::create(dir.path().join(name)).unwrap();
    }
    dir
}

#[tokio::test]
async fn publish_then_consume_round() {
    let dir = dir_with(&["a.txt", "b.txt"]);
    let broker = InMemoryBroker::new();

    let publisher = DirectoryPublisher::new(broker.clone(), "new_files");
    let report = publisher.publish_dir(dir.path()).await.unwrap();
    assert_eq!(report.sent, 2);

    let mut consumer = FeedConsumer::new(broker.consumer("new_files"), "new_files");
    let mut received = HashSet::new();
    received.insert(consumer.process_next().await.unwrap().unwrap());
    received.insert(consumer.process_next().await.unwrap().unwrap());

    // Order is unspecified; both full paths must arrive.
    let expected: HashSet<String> = ["a.txt", "b.txt"]
        .iter()
        .map(|n| dir.path().join(n).to_string_lossy().into_owned())
        .collect();
    assert_eq!(received, expected);
    assert!(broker.is_drained("new_files"));
}

#[tokio::test]
async fn republish_drops_previous_run() {
    let first = dir_with(&["old-1", "old-2", "old-3"]);
    let second = dir_with(&["current"]);
    let broker = InMemoryBroker::new();
    let publisher = DirectoryPublisher::new(broker.clone(), "new_files");

    publisher.publish_dir(first.path()).await.unwrap();
    let report = publisher.publish_dir(second.path()).await.unwrap();

    assert_eq!(report.purged, 3);
    assert_eq!(report.sent, 1);

    // Only the second run's message is delivered.
    let mut consumer = FeedConsumer::new(broker.consumer("new_files"), "new_files");
    let path = consumer.process_next().await.unwrap().unwrap();
    assert_eq!(
        path,
        second.path().join("current").to_string_lossy().into_owned()
    );
    assert!(broker.is_drained("new_files"));
}

#[tokio::test]
async fn missing_source_directory_is_reported_without_queue_side_effects() {
    let broker = InMemoryBroker::new();
    let publisher = DirectoryPublisher::new(broker.clone(), "new_files");

    let err = publisher
        .publish_dir(Path::new("/no/such/dir"))
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Listing { .. }));
    assert!(!broker.has_queue("new_files"));
}

#[tokio::test]
async fn prefetch_one_across_publisher_and_consumer() {
    let dir = dir_with(&["a", "b"]);
    let broker = InMemoryBroker::new();
    DirectoryPublisher::new(broker.clone(), "new_files")
        .publish_dir(dir.path())
        .await
        .unwrap();

    // Drive the raw consumer so the first delivery stays unacked.
    let mut raw = broker.consumer("new_files");
    let first = raw.next().await.unwrap().unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(50), raw.next()).await;
    assert!(blocked.is_err(), "second delivery arrived before first ack");

    raw.ack(first.tag).await.unwrap();
    assert!(raw.next().await.unwrap().is_some());
}

#[tokio::test]
async fn consumer_started_before_publish_processes_exactly_once() {
    let broker = InMemoryBroker::new();
    broker.consumer("new_files"); // declares the queue

    let consumer_broker = broker.clone();
    let receiver = tokio::spawn(async move {
        let mut consumer = FeedConsumer::new(consumer_broker.consumer("new_files"), "new_files");
        consumer.process_next().await.unwrap().unwrap()
    });

    // Let the consumer block on the empty queue first.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let dir = dir_with(&["only.txt"]);
    DirectoryPublisher::new(broker.clone(), "new_files")
        .publish_dir(dir.path())
        .await
        .unwrap();

    let path = receiver.await.unwrap();
    assert_eq!(
        path,
        dir.path().join("only.txt").to_string_lossy().into_owned()
    );
    assert!(broker.is_drained("new_files"));
}

#[tokio::test]
async fn dropped_consumer_requeues_for_the_next_one() {
    let dir = dir_with(&["fragile.txt"]);
    let broker = InMemoryBroker::new();
    DirectoryPublisher::new(broker.clone(), "new_files")
        .publish_dir(dir.path())
        .await
        .unwrap();

    {
        // Simulates a handler dying mid-message: delivery taken, never acked.
        let mut crashed = broker.consumer("new_files");
        crashed.next().await.unwrap().unwrap();
    }

    let mut consumer = FeedConsumer::new(broker.consumer("new_files"), "new_files");
    let path = consumer.process_next().await.unwrap().unwrap();
    assert_eq!(
        path,
        dir.path().join("fragile.txt").to_string_lossy().into_owned()
    );
    assert!(broker.is_drained("new_files"));
}
