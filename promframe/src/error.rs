//! Errors raised while reading delimited metric family streams

use thiserror::Error;

/// Everything that can stop a decode session.
///
/// Reaching the end of the stream on a frame boundary is not an error; readers
/// report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream ended while a length prefix continuation byte was expected.
    #[error("stream ended inside a frame length prefix after {bytes_read} byte(s)")]
    TruncatedLength {
        /// Varint bytes consumed before the stream ended
        bytes_read: usize,
    },

    /// The stream ended before a frame's payload was complete.
    #[error("stream ended inside a frame payload: expected {expected} bytes, {available} available")]
    TruncatedPayload {
        /// Length announced by the prefix
        expected: u64,
        /// Bytes actually read before the end of the stream
        available: u64,
    },

    /// The length prefix does not fit in 64 bits.
    #[error("frame length prefix is not a valid 64 bit varint")]
    MalformedLength,

    /// The length prefix is larger than the reader is willing to buffer.
    #[error("frame length {length} exceeds the limit of {limit} bytes")]
    FrameTooLarge {
        /// Length announced by the prefix
        length: u64,
        /// Configured maximum
        limit: u64,
    },

    /// The payload does not parse as the expected schema.
    #[error("frame {frame} could not be decoded: {source}")]
    Deserialize {
        /// Zero-based position of the frame in the stream
        frame: usize,
        /// What prost complained about
        #[source]
        source: prost::DecodeError,
    },

    /// The payload parsed but describes an impossible metric family.
    #[error("frame {frame} is not a valid metric family: {reason}")]
    InvalidFamily {
        /// Zero-based position of the frame in the stream
        frame: usize,
        /// Which invariant was broken
        reason: String,
    },

    /// The underlying byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Attribute a frame-level error to a position in the stream.
    pub(crate) fn at_frame(self, index: usize) -> Self {
        match self {
            DecodeError::Deserialize { source, .. } => DecodeError::Deserialize {
                frame: index,
                source,
            },
            DecodeError::InvalidFamily { reason, .. } => DecodeError::InvalidFamily {
                frame: index,
                reason,
            },
            other => other,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        DecodeError::InvalidFamily {
            frame: 0,
            reason: reason.into(),
        }
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(source: prost::DecodeError) -> Self {
        DecodeError::Deserialize { frame: 0, source }
    }
}
