/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame body was empty, so it cannot hold an envelope.
    #[error("empty frame")]
    EmptyFrame,

    /// A body handed to the encoder contains the reserved terminator byte.
    #[error("frame body contains terminator byte at offset {offset}")]
    TerminatorInBody { offset: usize },

    /// The frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a frame.
    #[error("connection closed mid-frame ({buffered} bytes without terminator)")]
    TruncatedFrame { buffered: usize },
}

impl FrameError {
    /// Whether the error came from the stream itself rather than from
    /// malformed frame content.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FrameError::Io(_) | FrameError::ConnectionClosed | FrameError::TruncatedFrame { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
