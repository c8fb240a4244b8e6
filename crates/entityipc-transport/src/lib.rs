//! Duplex stream abstraction for entityipc.
//!
//! The RPC layer only needs "bytes in, bytes out" plus the ability to read
//! and write from different threads. [`Duplex`] captures exactly that:
//! split a stream into a read half and a write half. Implementations are
//! provided for:
//! - [`IpcStream`] (Unix domain sockets via [`UnixDomainSocket`])
//! - `std::os::unix::net::UnixStream` and `std::net::TcpStream`
//! - any `(reader, WriteHalf<writer>)` pair, e.g. child process pipes
//!
//! This is the lowest layer of entityipc. Everything else builds on top of it.

pub mod duplex;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use duplex::{Duplex, DuplexWriter, WriteHalf};
pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
