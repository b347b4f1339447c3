//! Error types shared by the codec, the container parser and the pipelines

use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while encoding or decoding a container.
///
/// None of these are retried internally; they propagate to the caller as a
/// single failure. Partially written output files are left in place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File open/read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed container header or missing header/payload boundary
    #[error("Malformed container: {0}")]
    Format(String),

    /// Payload is not valid uppercase hex
    #[error("Invalid hex payload at offset {offset}: {message}")]
    Decode { offset: u64, message: String },

    /// Attribute or timestamp text that cannot be parsed or applied
    #[error("Metadata error: {0}")]
    Metadata(String),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }

    pub(crate) fn decode(offset: u64, message: impl Into<String>) -> Self {
        Error::Decode { offset, message: message.into() }
    }

    pub(crate) fn metadata(message: impl Into<String>) -> Self {
        Error::Metadata(message.into())
    }

    /// Shift the offset of a decode error by `base` bytes.
    ///
    /// The codec reports offsets relative to the chunk it was given; the
    /// decoder rebases them onto the payload.
    pub(crate) fn rebase(self, base: u64) -> Self {
        match self {
            Error::Decode { offset, message } => Error::Decode { offset: base + offset, message },
            other => other,
        }
    }
}
