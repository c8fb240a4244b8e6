use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use entityipc_transport::UnixDomainSocket;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::handler::HandlerBinding;
use crate::peer::Peer;

/// Listens for and accepts peer connections.
pub struct PeerListener {
    socket: UnixDomainSocket,
    config: ConnectionConfig,
    handler: Option<HandlerBinding>,
    next_peer_id: AtomicU64,
}

impl PeerListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self {
            socket,
            config: ConnectionConfig::default(),
            handler: None,
            next_peer_id: AtomicU64::new(1),
        })
    }

    /// Override the configuration applied to accepted connections.
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Handler installed on every accepted connection before its first frame
    /// is read.
    pub fn with_handler(mut self, handler: HandlerBinding) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Accept next connection and assign an auto-generated peer id.
    pub fn accept(&self) -> Result<Peer> {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        self.accept_with_id(&format!("peer-{id}"))
    }

    /// Accept next connection and use explicit peer id.
    pub fn accept_with_id(&self, peer_id: &str) -> Result<Peer> {
        let stream = self.socket.accept()?;
        stream.set_read_timeout(self.config.frame.read_timeout)?;
        stream.set_write_timeout(self.config.frame.write_timeout)?;

        if let Some((uid, _gid, pid)) = stream.peer_credentials() {
            info!(peer = peer_id, pid, uid, "peer connected");
        } else {
            info!(peer = peer_id, "peer connected");
        }

        Peer::start(
            peer_id,
            stream,
            self.config.clone(),
            self.handler.clone(),
        )
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}
