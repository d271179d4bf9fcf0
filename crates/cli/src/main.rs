//! MegaStore CLI - Catalog seeding and store management tools.
//!
//! # Usage
//!
//! ```bash
//! # Seed the products collection with the sample catalog
//! ms-cli seed
//!
//! # Seed even if the collection already has products
//! ms-cli seed --force
//!
//! # Check store connectivity and catalog size
//! ms-cli status
//! ```
//!
//! # Commands
//!
//! - `seed` - Populate the remote `products` collection
//! - `status` - Verify the store connection and report the catalog size

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ms-cli")]
#[command(author, version, about = "MegaStore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the remote products collection with the sample catalog
    Seed {
        /// Seed even when the collection already contains products
        #[arg(long)]
        force: bool,
    },
    /// Check store connectivity and report the catalog size
    Status,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed { force } => commands::seed::run(force).await?,
        Commands::Status => commands::status::run().await?,
    }
    Ok(())
}
