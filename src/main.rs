use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use filefeed::queue::AmqpBroker;
use filefeed::{DirectoryPublisher, FeedConfig, FeedConsumer, FeedError};

/// Publish the configured directory listing on its own connection, closed
/// when the phase ends.
async fn publish_phase(config: &FeedConfig) -> Result<(), FeedError> {
    let broker = AmqpBroker::connect(&config.broker_host).await?;
    let publisher = DirectoryPublisher::new(broker, &config.queue_name);
    let report = publisher.publish_dir(&config.source_path).await?;
    info!(sent = report.sent, "publish phase complete");

    publisher.into_queue().close().await?;
    Ok(())
}

/// Consume until the stream ends; the caller races this with Ctrl-C.
async fn consume_phase(config: &FeedConfig) -> Result<(), FeedError> {
    let broker = AmqpBroker::connect(&config.broker_host).await?;
    let consumer = broker.consumer(&config.queue_name).await?;
    FeedConsumer::new(consumer, &config.queue_name).run().await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FeedConfig::from_env();
    info!(
        source = %config.source_path.display(),
        broker = %config.broker_host,
        queue = %config.queue_name,
        "starting"
    );

    // A failed publish run does not stop the consumer; whatever is already
    // queued still gets drained.
    if let Err(e) = publish_phase(&config).await {
        error!(error = %e, "publish phase failed");
    }

    tokio::select! {
        result = consume_phase(&config) => {
            if let Err(e) = result {
                error!(error = %e, "consume phase failed");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }
}
