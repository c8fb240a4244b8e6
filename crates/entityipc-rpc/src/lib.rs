//! Bidirectional, correlated request/response calls over a duplex stream.
//!
//! Each side of a [`Connection`] can register a handler for inbound calls
//! and issue its own calls to the peer. Calls are matched to their replies
//! by a per-call id, so many calls may be in flight at once and replies may
//! arrive in any order.
//!
//! ```no_run
//! use entityipc_rpc::{connect, RpcError};
//! use serde_json::{json, Value};
//!
//! let peer = connect("/tmp/entityipc.sock")?;
//! let reply: Value = peer.call(&json!({"op": "echo", "value": "hi"}))?;
//! # Ok::<(), RpcError>(())
//! ```

pub mod config;
pub mod connection;
pub mod connector;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod ids;
#[cfg(unix)]
pub mod listener;
pub mod peer;
pub mod pending;

pub use config::{ConnectionConfig, DEFAULT_MAX_ID_ATTEMPTS};
pub use connection::Connection;
pub use connector::{connect, connect_with_config};
pub use envelope::{Envelope, EnvelopeError, EnvelopeKind, RemoteError, NO_HANDLER_MESSAGE};
pub use error::{Result, RpcError};
pub use handler::{HandlerBinding, JsonMap};
pub use ids::{IdSource, RandomIds, ScriptedIds};
#[cfg(unix)]
pub use listener::PeerListener;
pub use peer::Peer;
