//! Configuration for the publisher and consumer.
//!
//! The source directory, broker host, and queue name live in an explicit
//! structure handed to each component at construction, loadable from the
//! environment with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Default broker host.
pub const DEFAULT_BROKER_HOST: &str = "localhost";
/// Default queue name.
pub const DEFAULT_QUEUE_NAME: &str = "new_files";
/// Default source directory.
pub const DEFAULT_SOURCE_PATH: &str = ".";

/// Connection and routing parameters shared by the publisher and consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Directory whose entries are published, one message per entry
    pub source_path: PathBuf,
    /// Host name of the AMQP broker
    pub broker_host: String,
    /// Name of the durable queue both components declare
    pub queue_name: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            broker_host: DEFAULT_BROKER_HOST.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
        }
    }
}

impl FeedConfig {
    /// Create a config with explicit values for all three parameters.
    pub fn new(
        source_path: impl Into<PathBuf>,
        broker_host: impl Into<String>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            broker_host: broker_host.into(),
            queue_name: queue_name.into(),
        }
    }

    /// Load from `FILEFEED_SOURCE_DIR`, `FILEFEED_BROKER_HOST`, and
    /// `FILEFEED_QUEUE`, falling back to the defaults for any unset variable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            source_path: env::var("FILEFEED_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_path),
            broker_host: env::var("FILEFEED_BROKER_HOST").unwrap_or(defaults.broker_host),
            queue_name: env::var("FILEFEED_QUEUE").unwrap_or(defaults.queue_name),
        }
    }

    /// Set the source directory.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Set the broker host.
    pub fn with_broker_host(mut self, host: impl Into<String>) -> Self {
        self.broker_host = host.into();
        self
    }

    /// Set the queue name.
    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }
}
