use std::path::PathBuf;

use thiserror::Error;

/// Precondition failures of queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("no images queued")]
    Empty,
    #[error("no queued image at position {index} (queue holds {len})")]
    OutOfRange { index: usize, len: usize },
}

/// A rejected classification request.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("classifier answered with HTTP {status}")]
    Status { status: u16 },
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{0}")]
    Invalid(String),
}
