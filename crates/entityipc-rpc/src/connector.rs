use std::path::Path;

#[cfg(unix)]
use entityipc_transport::UnixDomainSocket;

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::handler::HandlerBinding;
use crate::peer::Peer;

/// Connect to a listening peer and start its dispatch loop.
pub fn connect(path: impl AsRef<Path>) -> Result<Peer> {
    connect_with_config(path, ConnectionConfig::default(), None)
}

/// Connect with explicit configuration and an optional handler for calls the
/// listener makes back to us.
pub fn connect_with_config(
    path: impl AsRef<Path>,
    config: ConnectionConfig,
    handler: Option<HandlerBinding>,
) -> Result<Peer> {
    #[cfg(not(unix))]
    {
        let _ = (config, handler);
        let path = path.as_ref().to_path_buf();
        return Err(entityipc_transport::TransportError::Connect {
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "entityipc-rpc sockets require Unix domain sockets",
            ),
        }
        .into());
    }

    #[cfg(unix)]
    {
        let stream = UnixDomainSocket::connect(&path)?;
        stream.set_read_timeout(config.frame.read_timeout)?;
        stream.set_write_timeout(config.frame.write_timeout)?;

        let id = path.as_ref().display().to_string();
        Peer::start(id, stream, config, handler)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::thread;

    use serde_json::{json, Value};

    use super::*;
    use crate::listener::PeerListener;

    #[test]
    fn connect_convenience() {
        let dir = std::env::temp_dir().join(format!(
            "eipc-c-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let sock_path = dir.join("listener.sock");

        let listener = PeerListener::bind(&sock_path)
            .expect("listener should bind")
            .with_handler(HandlerBinding::new(|v: Value| Ok::<_, String>(v)));

        let server = thread::spawn(move || {
            let peer = listener.accept().expect("listener should accept");
            peer.wait()
        });

        let client = connect(&sock_path).expect("client should connect");
        let echoed: Value = client
            .call(&json!({"hello": "world"}))
            .expect("call should succeed");
        assert_eq!(echoed, json!({"hello": "world"}));

        drop(client);
        assert!(server
            .join()
            .expect("server thread should complete")
            .is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_missing_socket_is_transport_error() {
        let err = connect("/tmp/eipc-definitely-missing.sock").unwrap_err();
        assert!(err.is_transport(), "{err}");
    }
}
