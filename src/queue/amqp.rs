//! AMQP backend for the queue seam, built on `lapin`.
//!
//! Everything protocol-level is delegated to the client library; this module
//! only maps the handful of operations the crate uses — declare, purge,
//! publish, consume with prefetch 1, ack — onto it.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions, QueuePurgeOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, info};

use super::{Delivery, QueueConsumer, QueuePublisher};
use crate::error::QueueError;

fn amqp_uri(host: &str) -> String {
    format!("amqp://{}:5672/%2f", host)
}

fn connection_error(context: &str, err: lapin::Error) -> QueueError {
    QueueError::ConnectionFailed(format!("{}: {}", context, err))
}

/// AMQP broker connection, producer side.
///
/// One connection with one channel, opened for the duration of a publish
/// phase and closed with [`close`](AmqpBroker::close).
pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
}

impl AmqpBroker {
    /// Connect to the broker at the given host on the default AMQP port.
    pub async fn connect(host: &str) -> Result<Self, QueueError> {
        let uri = amqp_uri(host);
        debug!(%uri, "connecting to broker");
        let connection = Connection::connect(&uri, ConnectionProperties::default())
            .await
            .map_err(|e| connection_error("failed to connect to broker", e))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| connection_error("failed to create channel", e))?;
        info!(host, "connected to broker");
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Close the channel and connection.
    pub async fn close(self) -> Result<(), QueueError> {
        self.connection
            .close(200, "closing")
            .await
            .map_err(|e| connection_error("failed to close connection", e))
    }

    /// Open a consumer on the given queue with a prefetch window of one.
    ///
    /// The queue is declared durable first, matching the producer side's
    /// idempotent declaration.
    pub async fn consumer(&self, queue: &str) -> Result<AmqpConsumer, QueueError> {
        self.declare(queue).await?;
        self.channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| connection_error("failed to set prefetch", e))?;
        let consumer = self
            .channel
            .basic_consume(
                queue,
                "filefeed",
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| connection_error("failed to start consumer", e))?;
        info!(queue, "consuming with prefetch 1");
        Ok(AmqpConsumer {
            channel: self.channel.clone(),
            consumer,
        })
    }
}

#[async_trait]
impl QueuePublisher for AmqpBroker {
    async fn declare(&self, queue: &str) -> Result<(), QueueError> {
        let options = QueueDeclareOptions {
            passive: false,
            durable: true,
            exclusive: false,
            auto_delete: false,
            nowait: false,
        };
        self.channel
            .queue_declare(queue, options, FieldTable::default())
            .await
            .map_err(|e| QueueError::Rejected(format!("failed to declare queue {}: {}", queue, e)))?;
        Ok(())
    }

    async fn purge(&self, queue: &str) -> Result<u32, QueueError> {
        let count = self
            .channel
            .queue_purge(queue, QueuePurgeOptions::default())
            .await
            .map_err(|e| QueueError::Rejected(format!("failed to purge queue {}: {}", queue, e)))?;
        Ok(count)
    }

    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), QueueError> {
        // Default exchange; the queue name doubles as the routing key.
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| connection_error("failed to publish", e))?
            .await
            .map_err(|e| connection_error("publish not confirmed", e))?;
        Ok(())
    }
}

/// AMQP delivery stream with manual acknowledgment.
pub struct AmqpConsumer {
    channel: Channel,
    consumer: lapin::Consumer,
}

#[async_trait]
impl QueueConsumer for AmqpConsumer {
    async fn next(&mut self) -> Result<Option<Delivery>, QueueError> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(Delivery::new(
                delivery.data,
                delivery.delivery_tag,
            ))),
            Some(Err(e)) => Err(connection_error("delivery failed", e)),
            None => Ok(None),
        }
    }

    async fn ack(&mut self, tag: u64) -> Result<(), QueueError> {
        self.channel
            .basic_ack(tag, BasicAckOptions::default())
            .await
            .map_err(|e| connection_error("failed to ack", e))
    }
}
