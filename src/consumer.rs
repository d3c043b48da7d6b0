//! Queue consumer: receive, log, ack, repeat.

use tracing::{info, warn};

use crate::error::FeedError;
use crate::queue::QueueConsumer;

/// Drains a queue one delivery at a time with manual acknowledgment.
///
/// Each delivery is logged and then acked; the ack only goes out once
/// handling is done, so a crash mid-handling leaves the message unacked and
/// the broker redelivers it. Backpressure comes from the consumer backend's
/// prefetch window of one.
pub struct FeedConsumer<C> {
    consumer: C,
    queue_name: String,
}

impl<C> FeedConsumer<C> {
    /// Create a consumer runner over the given backend.
    pub fn new(consumer: C, queue_name: impl Into<String>) -> Self {
        Self {
            consumer,
            queue_name: queue_name.into(),
        }
    }
}

impl<C: QueueConsumer> FeedConsumer<C> {
    /// Receive, log, and ack one delivery. Returns the delivered path, or
    /// `None` when the delivery stream has ended.
    ///
    /// Waits as long as it takes for a delivery to arrive.
    pub async fn process_next(&mut self) -> Result<Option<String>, FeedError> {
        let delivery = match self.consumer.next().await? {
            Some(delivery) => delivery,
            None => return Ok(None),
        };

        let path = match delivery.body_str() {
            Some(path) => path.to_string(),
            None => {
                // Not produced by our publisher; log it and ack anyway so it
                // doesn't wedge the queue.
                warn!(queue = %self.queue_name, tag = delivery.tag, "non-UTF-8 message body");
                String::from_utf8_lossy(&delivery.body).into_owned()
            }
        };
        info!(queue = %self.queue_name, path = %path, "received");

        self.consumer.ack(delivery.tag).await?;
        Ok(Some(path))
    }

    /// Process deliveries until the stream ends or an error occurs.
    ///
    /// Against a live broker this blocks indefinitely; the caller is
    /// expected to race it with a shutdown signal.
    pub async fn run(&mut self) -> Result<(), FeedError> {
        while self.process_next().await?.is_some() {}
        info!(queue = %self.queue_name, "delivery stream ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{InMemoryBroker, QueuePublisher};
    use std::time::Duration;

    #[tokio::test]
    async fn processes_and_acks_one_delivery() {
        let broker = InMemoryBroker::new();
        broker.declare("q").await.unwrap();
        broker.publish("q", b"/data/a.txt").await.unwrap();

        let mut consumer = FeedConsumer::new(broker.consumer("q"), "q");
        let path = consumer.process_next().await.unwrap();

        assert_eq!(path.as_deref(), Some("/data/a.txt"));
        assert!(broker.is_drained("q"));
    }

    #[tokio::test]
    async fn consumes_in_order() {
        let broker = InMemoryBroker::new();
        broker.declare("q").await.unwrap();
        broker.publish("q", b"first").await.unwrap();
        broker.publish("q", b"second").await.unwrap();

        let mut consumer = FeedConsumer::new(broker.consumer("q"), "q");
        assert_eq!(consumer.process_next().await.unwrap().as_deref(), Some("first"));
        assert_eq!(consumer.process_next().await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn blocks_on_empty_queue_until_publish() {
        let broker = InMemoryBroker::new();
        broker.declare("q").await.unwrap();

        let mut consumer = FeedConsumer::new(broker.consumer("q"), "q");

        // Nothing published yet: process_next must not return.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), consumer.process_next()).await;
        assert!(blocked.is_err());

        broker.publish("q", b"/data/late.txt").await.unwrap();
        let path = consumer.process_next().await.unwrap();
        assert_eq!(path.as_deref(), Some("/data/late.txt"));
        assert!(broker.is_drained("q"));
    }

    #[tokio::test]
    async fn non_utf8_body_is_acked_not_wedged() {
        let broker = InMemoryBroker::new();
        broker.declare("q").await.unwrap();
        broker.publish("q", &[0xff, 0xfe, b'x']).await.unwrap();
        broker.publish("q", b"/data/after.txt").await.unwrap();

        let mut consumer = FeedConsumer::new(broker.consumer("q"), "q");
        consumer.process_next().await.unwrap();
        let path = consumer.process_next().await.unwrap();
        assert_eq!(path.as_deref(), Some("/data/after.txt"));
    }
}
