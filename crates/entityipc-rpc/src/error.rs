use std::time::Duration;

use entityipc_frame::FrameError;
use entityipc_transport::TransportError;

use crate::envelope::{EnvelopeError, RemoteError};

/// Errors surfaced by connection and call operations.
///
/// The variants fall into the groups callers usually branch on:
/// transport failures ([`RpcError::is_transport`]), protocol violations
/// ([`RpcError::is_protocol`]), errors reported by the remote handler
/// ([`RpcError::Remote`]) and local decode mismatches ([`RpcError::Decode`]).
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level error (connect, accept, split).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error while reading or writing the stream.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A frame arrived that does not hold a valid envelope.
    #[error("protocol error: {0}")]
    Protocol(#[from] EnvelopeError),

    /// The remote handler answered with an error.
    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// The connection terminated while the call was pending, or before it
    /// could be issued.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The request value could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The reply payload does not match the expected response type.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// No reply arrived within the deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The connection has no stream attached yet.
    #[error("connection not started")]
    NotStarted,

    /// A stream was already attached to this connection.
    #[error("connection already started")]
    AlreadyStarted,

    /// Every generated call id collided with a pending call.
    #[error("no free call id after {0} attempts")]
    IdExhausted(usize),
}

impl RpcError {
    /// The stream failed or closed; the connection is gone.
    pub fn is_transport(&self) -> bool {
        match self {
            RpcError::Transport(_) | RpcError::ConnectionClosed(_) => true,
            RpcError::Frame(err) => err.is_transport(),
            _ => false,
        }
    }

    /// Malformed data on the wire.
    pub fn is_protocol(&self) -> bool {
        match self {
            RpcError::Protocol(_) => true,
            RpcError::Frame(err) => !err.is_transport(),
            _ => false,
        }
    }

    /// The peer's handler reported an error (including "no handler registered").
    pub fn is_remote(&self) -> bool {
        matches!(self, RpcError::Remote(_))
    }

    /// The reply arrived but did not decode into the expected type.
    pub fn is_decode(&self) -> bool {
        matches!(self, RpcError::Decode(_))
    }

    /// Message of a remote error, if this is one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            RpcError::Remote(err) => Some(&err.message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
