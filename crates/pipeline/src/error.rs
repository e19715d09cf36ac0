//! Pipeline error types

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Monitor target has an empty channel name
    #[error("channel name is empty")]
    EmptyChannel,

    /// Monitor target has an empty file path
    #[error("log file path is empty")]
    EmptyPath,

    /// Log file could not be opened (after bounded retries)
    #[error("cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Push listener could not be bound
    #[error("cannot bind push listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Maximum concurrent subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// Subscriber not found in the registry
    #[error("subscriber not found: {id}")]
    SubscriberNotFound { id: u64 },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
