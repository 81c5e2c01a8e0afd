use std::{io, path::PathBuf};

use thiserror::Error;

use quill_mime::MimeError;
use quill_smtp::ClientError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("QUILL_CONFIG points to non-existent file: {}", .0.display())]
    MissingOverride(PathBuf),

    #[error("No configuration file found. Tried:\n  - QUILL_CONFIG environment variable\n{tried}")]
    NotFound { tried: String },

    #[error("Failed to read config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Everything that can go wrong building or sending an [`Email`](crate::Email).
#[derive(Debug, Error)]
pub enum Error {
    /// The message could not be serialized. Nothing was sent.
    #[error("Failed to build message: {0}")]
    Build(#[from] MimeError),

    /// The SMTP session failed.
    #[error("Failed to send message: {0}")]
    Send(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
