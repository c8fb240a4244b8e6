//! Bidirectional request/response calls between processes.
//!
//! Either side of a connection can call the other and block for the
//! matching reply, while answering calls arriving from the peer with a
//! registered handler. Calls are JSON values carried in NUL-terminated
//! frames over any duplex byte stream.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex stream abstraction and Unix domain sockets
//! - [`frame`]: NUL-delimited framing, blocking and (behind `async`) tokio codec
//! - [`rpc`]: envelopes, pending calls, connections and peers (behind `rpc`)

/// Re-export transport types.
pub mod transport {
    pub use entityipc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use entityipc_frame::*;
}

/// Re-export call/response types (requires `rpc` feature).
#[cfg(feature = "rpc")]
pub mod rpc {
    pub use entityipc_rpc::*;
}
