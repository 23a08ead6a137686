//! Revenue report printing.
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` - Backend REST API root
//! - `SGSHOP_ADMIN_TOKEN` - Access token of an `ADMIN` account

use std::fmt::Write as _;

use chrono::Datelike;
use secrecy::{ExposeSecret, SecretString};
use sgshop_admin::api::AdminApiClient;
use sgshop_admin::config::ApiConfig;
use sgshop_core::{RevenueReport, revenue};

use super::CliError;

const TOKEN_VAR: &str = "SGSHOP_ADMIN_TOKEN";

fn admin_token() -> Result<SecretString, CliError> {
    std::env::var(TOKEN_VAR)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
        .ok_or(CliError::MissingEnvVar(TOKEN_VAR))
}

fn client() -> Result<AdminApiClient, CliError> {
    Ok(AdminApiClient::new(&ApiConfig::from_env()?)?)
}

/// Print twelve months of `year` (default: this year).
///
/// # Errors
///
/// Returns an error if the token or backend settings are missing or the
/// backend call fails.
#[allow(clippy::print_stdout)]
pub async fn yearly(year: Option<i32>) -> Result<(), CliError> {
    let year = year.unwrap_or_else(|| chrono::Local::now().year());
    let token = admin_token()?;

    let points = client()?.revenue_yearly(token.expose_secret(), year).await?;
    let report = revenue::yearly(&points);

    print!("{}", render(&format!("Doanh thu năm {year}"), "Tháng", &report));
    Ok(())
}

/// Print every day of `month` in `year` (default: the current month).
///
/// # Errors
///
/// Returns an error if the period is invalid, the token or backend
/// settings are missing, or the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn monthly(year: Option<i32>, month: Option<u32>) -> Result<(), CliError> {
    let now = chrono::Local::now();
    let year = year.unwrap_or_else(|| now.year());
    let month = month.unwrap_or_else(|| now.month());
    // Reject a bad period before any network call.
    revenue::days_in_month(year, month)?;
    let token = admin_token()?;

    let points = client()?
        .revenue_monthly(token.expose_secret(), year, month)
        .await?;
    let report = revenue::monthly(year, month, &points)?;

    print!("{}", render(&format!("Doanh thu tháng {month}/{year}"), "Ngày", &report));
    Ok(())
}

/// Plain-text table with a totals row and the best period.
pub fn render(title: &str, unit: &str, report: &RevenueReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{unit:>6}  {:>20}  {:>8}", "Doanh thu", "Đơn");
    for point in &report.points {
        let _ = writeln!(
            out,
            "{:>6}  {:>20}  {:>8}",
            point.label,
            point.revenue.to_string(),
            point.orders
        );
    }
    let _ = writeln!(
        out,
        "{:>6}  {:>20}  {:>8}",
        "Tổng",
        report.total_revenue.to_string(),
        report.total_orders
    );
    if let Some(best) = &report.best {
        let _ = writeln!(out, "Cao nhất: {unit} {} ({})", best.label, best.revenue);
    }
    out
}
