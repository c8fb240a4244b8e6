use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use entityipc_rpc::{HandlerBinding, JsonMap, PeerListener};
use serde_json::{json, Value};

use crate::cmd::ServeArgs;
use crate::exit::{rpc_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let mut listener =
        PeerListener::bind(&args.path).map_err(|err| rpc_error("bind failed", err))?;
    if !args.no_handler {
        listener = listener.with_handler(HandlerBinding::map(ops_handler));
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), listener.path().to_path_buf())?;

    while running.load(Ordering::SeqCst) {
        let peer = listener
            .accept()
            .map_err(|err| rpc_error("accept failed", err))?;
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let id = peer.id().to_string();
        let spawned = thread::Builder::new()
            .name(format!("serve-{id}"))
            .spawn(move || match peer.wait() {
                Ok(()) => tracing::info!(peer = %id, "peer disconnected"),
                Err(err) => tracing::warn!(peer = %id, error = %err, "peer connection failed"),
            });
        if let Err(err) = spawned {
            return Err(CliError::new(
                INTERNAL,
                format!("failed to spawn connection thread: {err}"),
            ));
        }
    }

    tracing::info!("shutting down");
    Ok(SUCCESS)
}

/// Answers `{"op":"echo","value":V}` with `{"value":V}` and
/// `{"op":"fail","message":M}` with the error `M`.
pub fn ops_handler(request: JsonMap) -> Result<Value, String> {
    match request.get("op").and_then(Value::as_str) {
        Some("echo") => Ok(json!({
            "value": request.get("value").cloned().unwrap_or(Value::Null)
        })),
        Some("fail") => Err(request
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("failed")
            .to_string()),
        _ => Err("unknown op".to_string()),
    }
}

// A blocked accept only returns on a new connection, so the handler dials
// the socket once after clearing the flag.
fn install_ctrlc_handler(running: Arc<AtomicBool>, path: std::path::PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        let _ = UnixStream::connect(&path);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
