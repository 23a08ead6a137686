//! Backend health probe.

use std::time::Instant;

use sgshop_admin::api::AdminApiClient;
use sgshop_admin::config::ApiConfig;

use super::CliError;

/// Ping the backend and print how long it took.
///
/// # Errors
///
/// Returns an error if `API_BASE_URL` is unset or the backend does not
/// answer.
#[allow(clippy::print_stdout)]
pub async fn check() -> Result<(), CliError> {
    let config = ApiConfig::from_env()?;
    let client = AdminApiClient::new(&config)?;

    tracing::debug!(url = %config.base_url, "Probing backend");
    let started = Instant::now();
    client.ping().await?;

    println!("ok  {}  ({} ms)", config.base_url, started.elapsed().as_millis());
    Ok(())
}
