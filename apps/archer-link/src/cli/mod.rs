//! # archer-link CLI Module
//!
//! ## Available Commands
//!
//! - `session` - Resolve a session and summarize it
//! - `fields` - Show the alias <-> id table of a record
//! - `get` - Read one field by alias
//! - `set` - Write one field by alias
//! - `apps` - List applications
//! - `values-list` - Show a values list with its hierarchy
//! - `datafeed` - Show the most recent run of a data feed
//! - `logout` - End the external session

mod commands;

use archer_link::config::DEFAULT_CONFIG_PATH;
use archer_link_core::{ArcherError, ContentId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// archer-link - Archer GRC REST client
///
/// Resolves an internal (hosted) or external (logged-in) session and works
/// with record fields by alias.
#[derive(Parser, Debug)]
#[command(name = "archer-link")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Record (content) id whose field metadata is resolved
    #[arg(short, long, global = true)]
    pub record: Option<u64>,

    /// Ignore cached field metadata and fetch it again
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a session and summarize it
    Session,

    /// Show the alias <-> id table of --record
    Fields,

    /// Read one field of --record
    Get {
        /// Field alias
        #[arg(short, long)]
        alias: String,
    },

    /// Write one field of --record
    Set {
        /// Field alias
        #[arg(short, long)]
        alias: String,

        /// New value as JSON (bare text is sent as a string)
        #[arg(short, long)]
        value: String,
    },

    /// List applications
    Apps,

    /// Show a values list with parent names and ordering
    ValuesList {
        /// Values list id
        #[arg(short, long)]
        id: u64,
    },

    /// Show the most recent run of a data feed
    Datafeed {
        /// Data feed GUID
        #[arg(short, long)]
        guid: String,
    },

    /// End the external session and forget its token
    Logout,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ArcherError> {
    let ctx = Context::open(&cli.config, cli.record.map(ContentId), cli.refresh, cli.json_mode)?;

    match cli.command {
        Some(Commands::Session) | None => cmd_session(&ctx).await,
        Some(Commands::Fields) => cmd_fields(&ctx).await,
        Some(Commands::Get { alias }) => cmd_get(&ctx, &alias).await,
        Some(Commands::Set { alias, value }) => cmd_set(&ctx, &alias, &value).await,
        Some(Commands::Apps) => cmd_apps(&ctx).await,
        Some(Commands::ValuesList { id }) => cmd_values_list(&ctx, id).await,
        Some(Commands::Datafeed { guid }) => cmd_datafeed(&ctx, &guid).await,
        Some(Commands::Logout) => cmd_logout(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "archer-link",
            "get",
            "--alias",
            "Title",
            "--record",
            "100",
            "--json-mode",
        ])
        .expect("parse");

        assert_eq!(cli.record, Some(100));
        assert!(cli.json_mode);
        assert_eq!(cli.config, PathBuf::from("archer-link.toml"));
        assert!(matches!(cli.command, Some(Commands::Get { ref alias }) if alias == "Title"));
    }

    #[test]
    fn values_list_command_name() {
        let cli = Cli::try_parse_from(["archer-link", "values-list", "--id", "9", "--refresh"])
            .expect("parse");
        assert!(cli.refresh);
        assert!(matches!(cli.command, Some(Commands::ValuesList { id: 9 })));
    }
}
