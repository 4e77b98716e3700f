// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StalkError {
    /// Bad command line (wrong argument count, empty command, ...).
    #[error("Usage error: {0}")]
    Usage(String),

    /// A directory could not be registered with the notification service
    /// during startup. Always fatal.
    #[error("Failed to watch {path:?}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: Box<StalkError>,
    },

    /// The notification service itself failed or stopped producing events.
    #[error("Watch service error: {0}")]
    Watch(String),

    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(String),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StalkError>;
