//! filefeed - publish a directory listing to a durable queue, then drain it.
//!
//! Two components over one configurable core:
//!
//! - [`DirectoryPublisher`] lists a directory (non-recursive), purges the
//!   target queue, and publishes one message per entry, the message body
//!   being the entry's full path.
//! - [`FeedConsumer`] receives deliveries one at a time (prefetch 1), logs
//!   each path, and manually acks it.
//!
//! Both program against the traits in [`queue`], with a `lapin`-backed AMQP
//! backend and an in-memory backend for tests.

mod config;
mod consumer;
mod error;
mod publisher;
pub mod queue;

pub use config::{
    FeedConfig, DEFAULT_BROKER_HOST, DEFAULT_QUEUE_NAME, DEFAULT_SOURCE_PATH,
};
pub use consumer::FeedConsumer;
pub use error::{FeedError, QueueError};
pub use publisher::{DirectoryPublisher, PublishReport};
