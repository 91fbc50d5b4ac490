//! Engine error taxonomy.
//!
//! Pixel-level glitches are ordinary data and never appear here; the retry
//! rounds consume them through the normal return path.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A configuration key has an unknown name or an unparseable value.
    #[error("{key}: {reason}")]
    KeyValue { key: String, reason: String },

    /// A required input file is absent.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Read/write or compression failure at the I/O boundary.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A map file carries a channel id this build does not know.
    #[error("invalid channel id: {0}")]
    InvalidChannelId(u8),

    /// Corrupted or unsupported map file.
    #[error("{0}")]
    Format(String),

    /// Arbitrary-precision conversion failure, wrapped with the offending key.
    #[error("numeric overflow in {0}")]
    NumericOverflow(String),

    /// Cooperative cancellation observed.
    #[error("user interrupt")]
    UserInterrupt,

    /// Clean early exit (help-style paths, not a failure).
    #[error("exit requested")]
    ExitRequest,
}

impl Error {
    pub fn key_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_message_names_the_key() {
        let e = Error::key_value("image.width", "must be greater than 0");
        assert_eq!(e.to_string(), "image.width: must be greater than 0");
    }

    #[test]
    fn io_errors_convert_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn channel_id_message_carries_the_id() {
        assert_eq!(Error::InvalidChannelId(9).to_string(), "invalid channel id: 9");
    }
}
