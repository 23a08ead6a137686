//! Integration tests for Sai Gon Shop.
//!
//! # Running Tests
//!
//! Start the backend, the storefront and the admin, then:
//!
//! ```bash
//! cargo test -p sgshop-integration-tests -- --ignored --test-threads=1
//! ```
//!
//! # Environment Variables
//!
//! - `SGSHOP_STOREFRONT_URL` - default `http://localhost:3000`
//! - `SGSHOP_ADMIN_URL` - default `http://localhost:3001`
//! - `API_BASE_URL` - backend root, default `http://localhost:8080/api/v1`
//! - `SGSHOP_TEST_ADMIN_EMAIL` / `SGSHOP_TEST_ADMIN_PASSWORD` - an `ADMIN` account
//! - `SGSHOP_TEST_CUSTOMER_EMAIL` / `SGSHOP_TEST_CUSTOMER_PASSWORD` - a `CUSTOMER` account
//!
//! # Test Categories
//!
//! - `storefront` - Public pages, cart, login
//! - `admin` - Back-office access control and pages

#![allow(clippy::missing_panics_doc)]

use reqwest::{Client, redirect};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sgshop_core::Page;
use sgshop_core::records::Product;

/// Where the running services are.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub storefront_url: String,
    pub admin_url: String,
    pub api_url: String,
}

/// Login details for a test account.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

impl TestContext {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            storefront_url: env_or("SGSHOP_STOREFRONT_URL", "http://localhost:3000"),
            admin_url: env_or("SGSHOP_ADMIN_URL", "http://localhost:3001"),
            api_url: env_or("API_BASE_URL", "http://localhost:8080/api/v1")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    #[must_use]
    pub fn storefront(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    #[must_use]
    pub fn admin(&self, path: &str) -> String {
        format!("{}{path}", self.admin_url)
    }

    /// Any product the backend currently lists, read straight from the API.
    pub async fn first_product(&self) -> Option<Product> {
        let response = Client::new()
            .get(format!("{}/products?page=0&size=1", self.api_url))
            .send()
            .await
            .ok()?;
        let page: Envelope<Page<Product>> = response.json().await.ok()?;
        page.data.content.into_iter().next()
    }
}

impl Credentials {
    /// Read `{prefix}_EMAIL` and `{prefix}_PASSWORD`; `None` when unset.
    #[must_use]
    pub fn from_env(prefix: &str) -> Option<Self> {
        let email = std::env::var(format!("{prefix}_EMAIL")).ok()?;
        let password = std::env::var(format!("{prefix}_PASSWORD")).ok()?;
        Some(Self {
            email,
            password: SecretString::from(password),
        })
    }

    /// Form body for either app's `/auth/login`.
    #[must_use]
    pub fn form(&self) -> [(&'static str, String); 2] {
        [
            ("email", self.email.clone()),
            ("password", self.password.expose_secret().to_string()),
        ]
    }
}

/// Cookie-keeping client that does not follow redirects, so tests can
/// assert on `Location`.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Header value as text, empty when absent.
#[must_use]
pub fn header(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
