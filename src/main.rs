//! cdp-snapshot - capture a browser tab's HTML from the command line.
//!
//! Emits exactly one JSON line on stdout: the success report or
//! `{"status":"error","error":...}`. Logs go to stderr so the report
//! stays machine-readable. Exit code 0 on success, 1 on any failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use cdp_snapshot::{CaptureOptions, capture_snapshot};

/// Capture rendered page HTML over the Chrome DevTools protocol.
#[derive(Parser)]
#[command(name = "cdp-snapshot")]
#[command(about = "Capture an HTML snapshot of a browser tab via the DevTools protocol")]
#[command(version)]
struct Args {
    /// Browser remote-debug base URL
    #[arg(long, default_value = "http://127.0.0.1:9222")]
    browser_url: String,

    /// Output html path (a .gz suffix selects gzip)
    #[arg(short, long)]
    output: PathBuf,

    /// Exact target id
    #[arg(long)]
    target_id: Option<String>,

    /// Pick the target whose url contains this text
    #[arg(long)]
    url_contains: Option<String>,

    /// UTF-8 byte cap for the html; 0 = unlimited
    #[arg(long, default_value_t = 0)]
    max_bytes: usize,

    /// Force gzip output even if the path does not end with .gz
    #[arg(long)]
    gzip: bool,

    /// Timeout in seconds for each network operation
    #[arg(long, default_value_t = 20)]
    timeout: u64,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let mut options = CaptureOptions::new(args.browser_url, args.output)
        .max_bytes(args.max_bytes)
        .gzip(args.gzip)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(id) = args.target_id {
        options = options.target_id(id);
    }
    if let Some(needle) = args.url_contains {
        options = options.url_contains(needle);
    }

    match capture_snapshot(options).await {
        Ok(result) => {
            println!("{}", result.report());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", json!({ "status": "error", "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}
