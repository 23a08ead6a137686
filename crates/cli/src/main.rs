//! Sai Gon Shop CLI - Operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Check the backend answers
//! sgshop-cli health
//!
//! # Decode an access token
//! sgshop-cli token inspect <jwt>
//!
//! # Print revenue reports (uses SGSHOP_ADMIN_TOKEN)
//! sgshop-cli revenue yearly --year 2024
//! sgshop-cli revenue monthly --year 2024 --month 6
//! ```
//!
//! # Commands
//!
//! - `health` - Probe the backend REST API
//! - `token inspect` - Print decoded claims, roles and expiry
//! - `revenue` - Print zero-filled revenue tables with totals

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "sgshop-cli")]
#[command(author, version, about = "Sai Gon Shop operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend API is reachable
    Health,
    /// Work with access tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Print revenue reports
    Revenue {
        #[command(subcommand)]
        report: RevenueReport,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Decode a JWT and print its claims (the signature is not verified)
    Inspect {
        /// The access token
        jwt: String,
    },
}

#[derive(Subcommand)]
enum RevenueReport {
    /// Twelve months of a year
    Yearly {
        /// Report year (default: current year)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Every day of a month
    Monthly {
        /// Report year (default: current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Month, 1 to 12 (default: current month)
        #[arg(short, long)]
        month: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sgshop_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Health => commands::health::check().await?,
        Commands::Token { action } => match action {
            TokenAction::Inspect { jwt } => commands::token::inspect(&jwt)?,
        },
        Commands::Revenue { report } => match report {
            RevenueReport::Yearly { year } => commands::revenue::yearly(year).await?,
            RevenueReport::Monthly { year, month } => {
                commands::revenue::monthly(year, month).await?;
            }
        },
    }
    Ok(())
}
