use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Failed to split a stream into independent read and write halves.
    #[error("failed to split duplex stream: {0}")]
    Split(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// Consume the error and return the underlying I/O error, if any.
    pub fn into_io(self) -> std::io::Error {
        match self {
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => source,
            TransportError::Accept(io) | TransportError::Split(io) | TransportError::Io(io) => io,
            other @ TransportError::PathTooLong { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, other.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
