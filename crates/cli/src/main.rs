//! Customer service CLI - store bootstrap and diagnostics.
//!
//! # Usage
//!
//! ```bash
//! # Create the username search index if missing
//! customer-cli index ensure
//!
//! # Check that the configured store is reachable
//! customer-cli check
//! ```
//!
//! Store settings are read from the same environment variables as the
//! service (`STORE_BACKEND`, `COUCHDB_*`, `STORE_TIMEOUT_MS`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "customer-cli")]
#[command(author, version, about = "Customer service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the username search index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Check that the document store is reachable
    Check,
}

#[derive(Subcommand)]
enum IndexAction {
    /// Create the index if it does not exist
    Ensure,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Index { action } => match action {
            IndexAction::Ensure => commands::index::ensure().await?,
        },
        Commands::Check => commands::check::run().await?,
    }
    Ok(())
}
