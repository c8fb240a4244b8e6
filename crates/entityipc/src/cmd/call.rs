use std::time::Instant;

use entityipc_rpc::{connect_with_config, ConnectionConfig};
use serde_json::Value;

use crate::cmd::{parse_duration, CallArgs};
use crate::exit::{rpc_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let request: Value = serde_json::from_str(&args.json)
        .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;

    let config = ConnectionConfig {
        call_timeout: Some(timeout),
        ..ConnectionConfig::default()
    };
    let peer = connect_with_config(&args.path, config, None)
        .map_err(|err| rpc_error("connect failed", err))?;

    let started = Instant::now();
    let reply: Value = peer
        .call(&request)
        .map_err(|err| rpc_error("call failed", err))?;
    tracing::debug!(elapsed = ?started.elapsed(), "reply received");

    print_reply(&reply, peer.id(), started.elapsed(), format);
    peer.close();
    Ok(SUCCESS)
}
