use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use entityipc_transport::Duplex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{Result, RpcError};
use crate::handler::HandlerBinding;

/// A started connection with a named identity and its own dispatch thread.
///
/// Dropping a `Peer` closes the connection without waiting for the dispatch
/// thread; use [`Peer::wait`] to observe how the connection ended.
pub struct Peer {
    id: String,
    connection: Arc<Connection>,
    dispatch: Option<JoinHandle<Result<()>>>,
}

impl Peer {
    /// Start a connection over `stream`. `handler`, if given, is installed
    /// before the first frame is read.
    pub fn start<S: Duplex>(
        id: impl Into<String>,
        stream: S,
        config: ConnectionConfig,
        handler: Option<HandlerBinding>,
    ) -> Result<Self> {
        let id = id.into();
        let connection = Arc::new(Connection::with_config(config));
        if let Some(binding) = handler {
            connection.set_handler(binding);
        }
        let dispatch = connection.spawn(stream)?;
        debug!(peer = %id, "peer started");

        Ok(Self {
            id,
            connection,
            dispatch: Some(dispatch),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the underlying connection, for issuing calls from
    /// other threads.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn call<Req, Resp>(&self, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.connection.call(request)
    }

    pub fn call_timeout<Req, Resp>(&self, request: &Req, timeout: Duration) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.connection.call_timeout(request, timeout)
    }

    /// Replace the inbound-call handler; see [`Connection::register_handler`].
    pub fn register_handler<T, R, E, F>(&self, handler: F)
    where
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: fmt::Display + 'static,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.connection.register_handler(handler);
    }

    pub fn set_handler(&self, binding: HandlerBinding) {
        self.connection.set_handler(binding);
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Close the connection. Pending calls fail with `ConnectionClosed`.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Block until the dispatch loop ends and return its outcome.
    pub fn wait(mut self) -> Result<()> {
        match self.dispatch.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(RpcError::ConnectionClosed(
                    "dispatch thread panicked".to_string(),
                ))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        if self.dispatch.is_some() {
            self.connection.close();
        }
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("connection", &self.connection)
            .finish()
    }
}
