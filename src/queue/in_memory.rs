//! In-memory broker for testing and single-process scenarios.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Delivery, QueueConsumer, QueuePublisher};
use crate::error::QueueError;

#[derive(Default)]
struct QueueState {
    /// Undelivered messages, oldest first
    pending: VecDeque<Delivery>,
    /// Delivered but unacked messages, keyed by tag
    unacked: HashMap<u64, Vec<u8>>,
    next_tag: u64,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, QueueState>,
}

/// In-memory broker implementing both sides of the queue seam.
///
/// Semantics match what the AMQP backend gets from a real broker:
/// - named FIFO queues, created by [`declare`](QueuePublisher::declare)
/// - messages removed only on ack, requeued if their consumer drops
/// - one unacked delivery per consumer at a time (prefetch = 1)
/// - destructive [`purge`](QueuePublisher::purge)
///
/// Thread-safe; `Clone` shares the same broker.
///
/// ## Example
///
/// ```
/// use filefeed::queue::{InMemoryBroker, QueuePublisher, QueueConsumer};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let broker = InMemoryBroker::new();
/// broker.declare("new_files").await.unwrap();
/// broker.publish("new_files", b"/data/a.txt").await.unwrap();
///
/// let mut consumer = broker.consumer("new_files");
/// let delivery = consumer.next().await.unwrap().unwrap();
/// assert_eq!(delivery.body_str(), Some("/data/a.txt"));
/// consumer.ack(delivery.tag).await.unwrap();
/// # });
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    /// Create a new broker with no queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a consumer attached to the given queue.
    ///
    /// The queue is declared implicitly if it does not exist, matching the
    /// consumer side's idempotent declaration.
    pub fn consumer(&self, queue: &str) -> InMemoryConsumer {
        self.state
            .lock()
            .unwrap()
            .queues
            .entry(queue.to_string())
            .or_default();
        InMemoryConsumer {
            broker: self.clone(),
            queue: queue.to_string(),
            in_flight: None,
        }
    }

    /// Number of undelivered messages in the queue.
    pub fn pending_len(&self, queue: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.pending.len())
            .unwrap_or(0)
    }

    /// Whether the queue holds no undelivered and no unacked messages.
    pub fn is_drained(&self, queue: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.pending.is_empty() && q.unacked.is_empty())
            .unwrap_or(true)
    }

    /// Whether the queue has been declared.
    pub fn has_queue(&self, queue: &str) -> bool {
        self.state.lock().unwrap().queues.contains_key(queue)
    }

    /// Undelivered message bodies, oldest first.
    pub fn pending_bodies(&self, queue: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(|q| q.pending.iter().map(|d| d.body.clone()).collect())
            .unwrap_or_default()
    }

    fn requeue_unacked(&self, queue: &str, tag: u64) {
        let mut state = self.state.lock().unwrap();
        if let Some(q) = state.queues.get_mut(queue) {
            if let Some(body) = q.unacked.remove(&tag) {
                // Redelivery goes to the head of the queue, like a broker
                // requeueing after a consumer disconnect.
                q.pending.push_front(Delivery::new(body, tag));
            }
        }
    }
}

#[async_trait]
impl QueuePublisher for InMemoryBroker {
    async fn declare(&self, queue: &str) -> Result<(), QueueError> {
        self.state
            .lock()
            .unwrap()
            .queues
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn purge(&self, queue: &str) -> Result<u32, QueueError> {
        let mut state = self.state.lock().unwrap();
        let q = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::Rejected(format!("no such queue: {}", queue)))?;
        let dropped = q.pending.len() as u32;
        q.pending.clear();
        Ok(dropped)
    }

    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        let q = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::Rejected(format!("no such queue: {}", queue)))?;
        let tag = q.next_tag;
        q.next_tag += 1;
        q.pending.push_back(Delivery::new(body.to_vec(), tag));
        Ok(())
    }
}

/// Consumer handle onto an [`InMemoryBroker`] queue.
///
/// Holds at most one unacked delivery; [`next`](QueueConsumer::next) waits
/// until the previous delivery is acked before handing out another. Dropping
/// the consumer requeues its unacked delivery.
pub struct InMemoryConsumer {
    broker: InMemoryBroker,
    queue: String,
    in_flight: Option<u64>,
}

#[async_trait]
impl QueueConsumer for InMemoryConsumer {
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError> {
        loop {
            {
                let mut state = self.broker.state.lock().unwrap();
                let q = state
                    .queues
                    .get_mut(&self.queue)
                    .ok_or_else(|| QueueError::Rejected(format!("no such queue: {}", self.queue)))?;
                if self.in_flight.is_none() {
                    if let Some(delivery) = q.pending.pop_front() {
                        q.unacked.insert(delivery.tag, delivery.body.clone());
                        self.in_flight = Some(delivery.tag);
                        return Ok(Some(delivery));
                    }
                }
            }

            // Small sleep to avoid busy-waiting
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn ack(&mut self, tag: u64) -> Result<(), QueueError> {
        let mut state = self.broker.state.lock().unwrap();
        let q = state
            .queues
            .get_mut(&self.queue)
            .ok_or_else(|| QueueError::Rejected(format!("no such queue: {}", self.queue)))?;
        if q.unacked.remove(&tag).is_none() {
            return Err(QueueError::Rejected(format!("unknown delivery tag: {}", tag)));
        }
        if self.in_flight == Some(tag) {
            self.in_flight = None;
        }
        Ok(())
    }
}

impl Drop for InMemoryConsumer {
    fn drop(&mut self) {
        if let Some(tag) = self.in_flight.take() {
            self.broker.requeue_unacked(&self.queue, tag);
        }
    }
}
