#![cfg(all(unix, feature = "cli"))]

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use entityipc::rpc::connect;
use serde_json::{json, Value};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/eipccli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_entityipc"))
}

fn spawn_server(sock_path: &Path, extra: &[&str]) -> Child {
    let child = bin()
        .args(["--log-level", "error", "serve"])
        .arg(sock_path)
        .args(extra)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start");
    wait_for_socket(sock_path, Duration::from_secs(3)).expect("server should start listening");
    child
}

fn wait_for_socket(path: &Path, timeout: Duration) -> io::Result<()> {
    let start = Instant::now();
    loop {
        match connect(path) {
            Ok(peer) => {
                peer.close();
                return Ok(());
            }
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn run_call(sock_path: &Path, json: &str, format: &str) -> Output {
    bin()
        .args(["--log-level", "error", "--format", format, "call"])
        .arg(sock_path)
        .args(["--json", json, "--timeout", "3s"])
        .output()
        .expect("call command should run")
}

struct Server {
    child: Child,
    dir: PathBuf,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn call_echo_against_serve() {
    let dir = unique_temp_dir("echo");
    let sock_path = dir.join("serve.sock");
    let _server = Server {
        child: spawn_server(&sock_path, &[]),
        dir,
    };

    let output = run_call(&sock_path, r#"{"op":"echo","value":"x"}"#, "json");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let line: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(line["reply"], json!({"value": "x"}));
    assert!(line["peer"].as_str().unwrap().ends_with("serve.sock"));
}

#[test]
fn raw_format_prints_bare_reply() {
    let dir = unique_temp_dir("raw");
    let sock_path = dir.join("serve.sock");
    let _server = Server {
        child: spawn_server(&sock_path, &[]),
        dir,
    };

    let output = run_call(&sock_path, r#"{"op":"echo","value":[1,2]}"#, "raw");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), r#"{"value":[1,2]}"#);
}

#[test]
fn remote_failure_exits_with_failure_code() {
    let dir = unique_temp_dir("fail");
    let sock_path = dir.join("serve.sock");
    let _server = Server {
        child: spawn_server(&sock_path, &[]),
        dir,
    };

    let output = run_call(&sock_path, r#"{"op":"fail","message":"boom"}"#, "json");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("boom"));

    let output = run_call(&sock_path, r#"{"op":"launch"}"#, "json");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown op"));
}

#[test]
fn server_without_handler_reports_it() {
    let dir = unique_temp_dir("nohandler");
    let sock_path = dir.join("serve.sock");
    let _server = Server {
        child: spawn_server(&sock_path, &["--no-handler"]),
        dir,
    };

    let output = run_call(&sock_path, r#"{"op":"echo","value":1}"#, "json");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no handler registered"));
}

#[test]
fn missing_socket_is_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = run_call(&dir.join("nobody.sock"), "{}", "json");
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_json_argument_is_usage_error() {
    let dir = unique_temp_dir("usage");
    let output = run_call(&dir.join("unused.sock"), "{not json", "json");
    assert_eq!(output.status.code(), Some(64));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_crate_version() {
    let output = bin().arg("version").output().expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("entityipc {}", env!("CARGO_PKG_VERSION"))
    );
}
