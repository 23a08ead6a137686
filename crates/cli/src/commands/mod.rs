//! Subcommand implementations.

pub mod health;
pub mod revenue;
pub mod token;

use sgshop_admin::api::ApiError;
use sgshop_admin::config::ConfigError;
use sgshop_core::{ClaimsError, ReportError};
use thiserror::Error;

/// Errors any command can end with. All of them exit with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid token: {0}")]
    Token(#[from] ClaimsError),

    #[error("Invalid report period: {0}")]
    Report(#[from] ReportError),
}
