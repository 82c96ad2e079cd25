//! # archer-link
//!
//! Command-line front end for the archer-link client.
//!
//! ## Usage
//!
//! ```bash
//! # Resolve a session (hosted if ARCHER_CSRF_TOKEN is set, otherwise login)
//! archer-link session
//!
//! # Work with fields of a record by alias
//! archer-link --record 100 fields
//! archer-link --record 100 get --alias Title
//! archer-link --record 100 set --alias Title --value '"New title"'
//!
//! # Machine-readable output
//! archer-link --json-mode apps
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // ARCHER_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr; stdout carries command output.
    let log_format = std::env::var("ARCHER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "archer_link=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();
    let json_mode = cli.json_mode;

    if let Err(e) = cli::execute(cli).await {
        if json_mode {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "error": e.to_payload() }))
                    .unwrap_or_default()
            );
        }
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
