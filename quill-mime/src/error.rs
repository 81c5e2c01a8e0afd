use std::io;

use thiserror::Error;

/// Errors raised while turning a message into MIME.
#[derive(Error, Debug)]
pub enum MimeError {
    /// The random source could not produce a boundary.
    ///
    /// Raised before anything has been written.
    #[error("Unable to generate MIME boundary: {0}")]
    Boundary(String),

    /// An attachment's content stream failed while being read.
    #[error("Unable to read attachment {filename}: {source}")]
    Attachment {
        filename: String,
        #[source]
        source: io::Error,
    },

    /// Writing a part, header or encoded payload failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MimeError {
    /// Returns `true` if nothing could be written because no boundary was available.
    #[must_use]
    pub const fn is_generation(&self) -> bool {
        matches!(self, Self::Boundary(_))
    }

    /// Returns `true` if the failure happened while encoding content.
    #[must_use]
    pub const fn is_encoding(&self) -> bool {
        matches!(self, Self::Attachment { .. } | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, MimeError>;
