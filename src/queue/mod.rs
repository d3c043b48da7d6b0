//! Queue seam - broker abstractions and backends
//!
//! The publisher and consumer components program against two small traits,
//! [`QueuePublisher`] and [`QueueConsumer`], covering exactly the operations
//! this crate needs: durable declare, purge, publish, consume with manual
//! ack.
//!
//! Two backends are included:
//! - [`AmqpBroker`] / [`AmqpConsumer`] - `lapin`-backed, for a real broker
//! - [`InMemoryBroker`] / [`InMemoryConsumer`] - in-process, for tests and
//!   single-process use

mod amqp;
mod broker;
mod in_memory;

pub use amqp::{AmqpBroker, AmqpConsumer};
pub use broker::{Delivery, QueueConsumer, QueuePublisher};
pub use in_memory::{InMemoryBroker, InMemoryConsumer};
