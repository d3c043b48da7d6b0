//! Core traits for the broker seam.

use async_trait::async_trait;

use crate::error::QueueError;

/// A message delivered from a queue.
///
/// The body is the raw payload published by the producer; for this crate that
/// is always a file-system path as UTF-8 bytes. The tag identifies the
/// delivery to the broker and is what [`QueueConsumer::ack`] references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Raw message body
    pub body: Vec<u8>,
    /// Broker-assigned delivery tag
    pub tag: u64,
}

impl Delivery {
    /// Create a delivery with the given body and tag.
    pub fn new(body: impl Into<Vec<u8>>, tag: u64) -> Self {
        Self {
            body: body.into(),
            tag,
        }
    }

    /// Get the body as a string (if valid UTF-8).
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Producer side of a named queue.
///
/// Implementations might include:
/// - `InMemoryBroker` - For testing and single-process scenarios
/// - `AmqpBroker` - For RabbitMQ and other AMQP brokers
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Declare the queue as durable. Creates it if absent; has no effect if
    /// an identical declaration already exists.
    async fn declare(&self, queue: &str) -> Result<(), QueueError>;

    /// Destructively remove every undelivered message from the queue.
    /// Returns the number of messages dropped.
    async fn purge(&self, queue: &str) -> Result<u32, QueueError>;

    /// Publish one message body to the queue.
    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), QueueError>;
}

/// Consumer side of a named queue, with manual acknowledgment.
///
/// A delivery is only removed from the queue once [`ack`](Self::ack) is
/// called with its tag. Implementations enforce a prefetch window of one:
/// the next delivery is not handed out while an earlier one is unacked.
#[async_trait]
pub trait QueueConsumer: Send {
    /// Wait for the next delivery. Returns `None` when the delivery stream
    /// has ended (connection or channel closed).
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledge a delivery, removing it from the queue.
    async fn ack(&mut self, tag: u64) -> Result<(), QueueError>;
}
