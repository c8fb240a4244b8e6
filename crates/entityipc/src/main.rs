mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "entityipc", version, about = "Call and serve entityipc peers")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true, env = "ENTITYIPC_FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        global = true,
        env = "ENTITYIPC_LOG_FORMAT"
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        global = true,
        env = "ENTITYIPC_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "entityipc",
            "call",
            "/tmp/test.sock",
            "--json",
            r#"{"op":"echo","value":1}"#,
            "--timeout",
            "250ms",
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.timeout, "250ms");
                assert!(args.json.contains("echo"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn call_requires_json() {
        let err = Cli::try_parse_from(["entityipc", "call", "/tmp/test.sock"])
            .expect_err("missing --json should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[cfg(unix)]
    #[test]
    fn parses_serve_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "entityipc",
            "serve",
            "/tmp/test.sock",
            "--no-handler",
            "--log-level",
            "debug",
            "--format",
            "raw",
        ])
        .expect("serve args should parse");

        assert!(matches!(cli.command, Command::Serve(ref args) if args.no_handler));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.format, Some(OutputFormat::Raw));
    }
}
