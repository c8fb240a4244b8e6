use std::io::{IsTerminal, Write};
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    peer: &'a str,
    elapsed_ms: u128,
    reply: &'a Value,
}

pub fn print_reply(reply: &Value, peer: &str, elapsed: Duration, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                peer,
                elapsed_ms: elapsed.as_millis(),
                reply,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            println!("{}", reply_table(reply));
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(reply).unwrap_or_else(|_| reply.to_string())
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = writeln!(out, "{}", raw_text(reply));
            let _ = out.flush();
        }
    }
}

fn reply_table(reply: &Value) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match reply {
        Value::Object(fields) => {
            table.set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in fields {
                table.add_row(vec![key.clone(), raw_text(value)]);
            }
        }
        other => {
            table.set_header(vec!["VALUE"]);
            table.add_row(vec![raw_text(other)]);
        }
    }
    table
}

/// Strings print without quotes; everything else as compact JSON.
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
