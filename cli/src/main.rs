//! Lantern CLI
//!
//! Command-line interface for the Lantern gateway console.
//!
//! # Usage
//!
//! ```bash
//! lantern --help
//! lantern health
//! lantern traces --limit 20
//! lantern diagnose captured.json
//! lantern duration parse 1.5s
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use shared::assembler::TraceAssembler;
use shared::diagnostics::analyze_trace;
use shared::duration::{format_duration, parse_duration, Duration};
use shared::models::{Diagnostic, RawEntry, Trace};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lantern CLI - gateway traces and diagnostics from the command line
#[derive(Parser)]
#[command(name = "lantern")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API server URL
    #[arg(
        short,
        long,
        env = "LANTERN_API_URL",
        default_value = "http://localhost:8080"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API server health
    Health,
    /// List the most recent traces
    Traces {
        /// Maximum number of traces to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Assemble traces from a file of captured entries and print diagnostics
    Diagnose {
        /// JSON file holding one captured entry or an array of them
        file: PathBuf,
        /// Service name used for root spans
        #[arg(short, long, default_value = "gateway")]
        service: String,
    },
    /// Parse or format protocol durations
    Duration {
        #[command(subcommand)]
        command: DurationCommand,
    },
}

#[derive(Subcommand)]
enum DurationCommand {
    /// Parse text such as "1.5s" into seconds and nanoseconds
    Parse {
        /// Duration text
        text: String,
    },
    /// Format seconds and nanoseconds as the shortest duration text
    Format {
        /// Whole seconds
        seconds: u32,
        /// Nanosecond remainder
        #[arg(default_value_t = 0, value_parser = clap::value_parser!(i32).range(0..1_000_000_000))]
        nanos: i32,
    },
}

#[derive(Debug, Deserialize)]
struct TraceList {
    traces: Vec<Trace>,
    total_count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Health) => {
            let url = format!("{}/health", cli.api_url.trim_end_matches('/'));
            let body: serde_json::Value = get_json(&url).await?;
            println!(
                "{} ({})",
                body["status"].as_str().unwrap_or("unknown"),
                body["version"].as_str().unwrap_or("?")
            );
        }
        Some(Commands::Traces { limit }) => {
            let url = format!(
                "{}/api/v1/traces?limit={limit}",
                cli.api_url.trim_end_matches('/')
            );
            let list: TraceList = get_json(&url).await?;
            for trace in &list.traces {
                println!("{}", trace_line(trace));
            }
            println!("{} trace(s)", list.total_count);
        }
        Some(Commands::Diagnose { file, service }) => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let entries = load_entries(&text)?;
            let assembler = TraceAssembler::new(service);
            for trace in assembler.assemble_batch(&entries) {
                let diagnostics = analyze_trace(&trace);
                print!("{}", report(&trace, &diagnostics));
            }
        }
        Some(Commands::Duration { command }) => match command {
            DurationCommand::Parse { text } => {
                let Some(duration) = parse_duration(&text) else {
                    bail!("Invalid duration: '{text}'");
                };
                println!("seconds={} nanos={}", duration.seconds, duration.nanos);
            }
            DurationCommand::Format { seconds, nanos } => {
                println!(
                    "{}",
                    format_duration(&Duration::new(i64::from(seconds), nanos))
                );
            }
        },
        None => {
            println!("Lantern CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

async fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T> {
    tracing::debug!(url, "GET");
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to reach {url}"))?
        .error_for_status()?;
    Ok(response.json().await?)
}

/// Reads either a single captured entry or an array of them.
fn load_entries(text: &str) -> Result<Vec<RawEntry>> {
    let value: serde_json::Value = serde_json::from_str(text).context("File is not JSON")?;
    let entries = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(entries)
}

fn trace_line(trace: &Trace) -> String {
    format!(
        "{}  {:<7} {:>9.1}ms  {:>3} spans  {}",
        trace.timestamp,
        trace.status.to_string(),
        trace.total_duration,
        trace.span_count(),
        trace.root_span.name
    )
}

fn report(trace: &Trace, diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("{}  {}\n", trace.id, trace_line(trace));
    if diagnostics.is_empty() {
        out.push_str("  no issues found\n");
    }
    for diagnostic in diagnostics {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            diagnostic.kind, diagnostic.title, diagnostic.message
        );
        if let Some(suggestion) = &diagnostic.suggestion {
            let _ = writeln!(out, "      {suggestion}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["lantern"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_health_command() {
        let cli = Cli::try_parse_from(["lantern", "health"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
    }

    #[test]
    fn test_cli_traces_limit() {
        let cli = Cli::try_parse_from(["lantern", "traces", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Traces { limit: 5 })));
    }

    #[test]
    fn test_cli_rejects_out_of_range_nanos() {
        let cli = Cli::try_parse_from(["lantern", "duration", "format", "1", "1000000000"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["lantern", "duration", "format", "1", "500000000"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_load_single_and_many_entries() {
        let single = r#"{"id":"a","timestamp":"2026-01-05T10:00:00Z","method":"GET","path":"/","status":200}"#;
        assert_eq!(load_entries(single).unwrap().len(), 1);

        let many = format!("[{single},{single}]");
        assert_eq!(load_entries(&many).unwrap().len(), 2);

        assert!(load_entries("not json").is_err());
    }

    #[test]
    fn test_report_lists_diagnostics() {
        let entry = RawEntry::new("req-1", "POST", "/mcp", 429)
            .with_response_body(r#"{"error":"Too Many Requests"}"#);
        let trace = TraceAssembler::default().assemble(&entry);
        let diagnostics = analyze_trace(&trace);

        let text = report(&trace, &diagnostics);

        assert!(text.starts_with("req-1"));
        assert!(text.contains("[warning] Rate Limit Exceeded"));
    }

    #[test]
    fn test_report_without_issues() {
        let entry = RawEntry::new("ok", "GET", "/", 200);
        let trace = TraceAssembler::default().assemble(&entry);

        assert!(report(&trace, &[]).contains("no issues found"));
    }
}
