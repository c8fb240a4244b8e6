//! Minimal echo server: accepts one peer and answers its calls.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- call /tmp/entityipc-echo-<pid>/echo.sock \
//!     --json '{"op":"echo","value":"hello"}'

use std::fs;

use entityipc::rpc::{HandlerBinding, JsonMap, PeerListener};
use serde_json::{json, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("entityipc-echo-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("echo.sock");

    let listener = PeerListener::bind(&sock_path)?.with_handler(HandlerBinding::map(
        |req: JsonMap| -> Result<Value, String> {
            eprintln!("Received call: {}", Value::Object(req.clone()));
            Ok(json!({ "value": req.get("value").cloned().unwrap_or(Value::Null) }))
        },
    ));
    eprintln!("Listening on {}", sock_path.display());

    let peer = listener.accept()?;
    eprintln!("Peer connected: {}", peer.id());

    match peer.wait() {
        Ok(()) => eprintln!("Peer disconnected"),
        Err(e) => eprintln!("Connection failed: {e}"),
    }

    drop(listener);
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
