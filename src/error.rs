use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for broker-seam operations (declare, purge, publish, consume).
#[derive(Debug)]
pub enum QueueError {
    /// Connection to the broker failed or was lost
    ConnectionFailed(String),
    /// The broker rejected a single operation; the connection is still usable
    Rejected(String),
    /// The channel or delivery stream was closed by the broker
    Closed,
    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// Whether the error is fatal for the connection as a whole, as opposed
    /// to a per-operation rejection that the caller may skip past.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, QueueError::Rejected(_))
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            QueueError::Rejected(msg) => write!(f, "operation rejected: {}", msg),
            QueueError::Closed => write!(f, "channel closed"),
            QueueError::Other(e) => write!(f, "queue error: {}", e),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Top-level error for the publish and consume phases.
///
/// The caller gets a typed value and decides whether to abort, retry, or
/// just log.
#[derive(Debug)]
pub enum FeedError {
    /// Listing the source directory failed; no broker operation has happened
    Listing { path: PathBuf, source: io::Error },
    /// A broker operation failed
    Queue(QueueError),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Listing { path, source } => {
                write!(f, "failed to list directory {}: {}", path.display(), source)
            }
            FeedError::Queue(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Listing { source, .. } => Some(source),
            FeedError::Queue(e) => Some(e),
        }
    }
}

impl From<QueueError> for FeedError {
    fn from(e: QueueError) -> Self {
        FeedError::Queue(e)
    }
}
