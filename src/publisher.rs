//! Directory-listing publisher.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::FeedError;
use crate::queue::QueuePublisher;

/// Result of one publish run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Messages successfully enqueued
    pub sent: usize,
    /// Entries skipped because the broker rejected their publish
    pub skipped: usize,
    /// Messages dropped from the queue by the pre-publish purge
    pub purged: u32,
}

/// Publishes a directory listing to a queue, one message per entry.
///
/// Each run is a destructive reset: the queue is purged before the new
/// listing is published. The listing is non-recursive and unfiltered —
/// entry type is not checked — and entries are published in whatever order
/// the filesystem returns them.
///
/// ## Example
///
/// ```
/// use filefeed::{DirectoryPublisher, queue::InMemoryBroker};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let broker = InMemoryBroker::new();
/// let publisher = DirectoryPublisher::new(broker.clone(), "new_files");
/// let report = publisher.publish_dir(std::path::Path::new(".")).await.unwrap();
/// assert_eq!(broker.pending_len("new_files"), report.sent);
/// # });
/// ```
pub struct DirectoryPublisher<P> {
    queue: P,
    queue_name: String,
}

impl<P> DirectoryPublisher<P> {
    /// Create a publisher targeting the given queue.
    pub fn new(queue: P, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
        }
    }

    /// Get a reference to the underlying queue backend.
    pub fn queue(&self) -> &P {
        &self.queue
    }

    /// Consume the publisher, returning the queue backend (e.g. to close a
    /// connection once the publish phase is done).
    pub fn into_queue(self) -> P {
        self.queue
    }
}

impl<P: QueuePublisher> DirectoryPublisher<P> {
    /// List `source` and publish one message per entry, purging the queue
    /// first.
    ///
    /// The listing is read in full before any broker operation, so a missing
    /// or unreadable directory leaves the queue untouched — no declare, no
    /// purge.
    ///
    /// A per-entry rejection is logged and skipped; a connection-level
    /// failure aborts the run.
    pub async fn publish_dir(&self, source: &Path) -> Result<PublishReport, FeedError> {
        let paths = list_entries(source)?;

        self.queue.declare(&self.queue_name).await?;
        let purged = self.queue.purge(&self.queue_name).await?;
        if purged > 0 {
            info!(queue = %self.queue_name, purged, "purged stale messages");
        }

        let mut report = PublishReport {
            purged,
            ..PublishReport::default()
        };
        for path in &paths {
            match self.queue.publish(&self.queue_name, path.as_bytes()).await {
                Ok(()) => report.sent += 1,
                Err(e) if !e.is_fatal() => {
                    warn!(path = %path, error = %e, "skipping entry");
                    report.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            queue = %self.queue_name,
            sent = report.sent,
            skipped = report.skipped,
            "published directory listing"
        );
        Ok(report)
    }
}

/// List the entries of `dir` as full paths, in filesystem order.
fn list_entries(dir: &Path) -> Result<Vec<String>, FeedError> {
    let listing = |source| FeedError::Listing {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(listing)? {
        let entry = entry.map_err(listing)?;
        paths.push(entry.path().to_string_lossy().into_owned());
    }
    Ok(paths)
}
