// src/config.rs
//! Run configuration value objects.
//!
//! Credentials live in the environment (loaded from `.env` in dev via
//! `dotenvy` at startup). Each config struct is built once per run at the
//! shell boundary and passed into the components that need it; core logic
//! never reads the environment on its own. A missing required variable is a
//! fatal configuration error, raised before any network I/O for the step
//! that depends on it.

use anyhow::{Context, Result};

/// Default mail submission endpoint (STARTTLS).
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default search provider endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.exa.ai/search";

/// SMTP submission settings for the delivery assembler.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender address, doubles as the SMTP username.
    pub sender: String,
    /// App password for the sender account.
    pub password: String,
    /// Fallback recipient when a request carries no addresses.
    pub default_recipient: Option<String>,
}

impl MailConfig {
    /// Required: `EMAIL_USER`, `EMAIL_APP_PASSWORD`.
    /// Optional: `EMAIL_RECIPIENT`, `SMTP_HOST`, `SMTP_PORT`.
    pub fn from_env() -> Result<Self> {
        let sender = std::env::var("EMAIL_USER").context("EMAIL_USER not set")?;
        let password =
            std::env::var("EMAIL_APP_PASSWORD").context("EMAIL_APP_PASSWORD not set")?;
        let smtp_host =
            std::env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string());
        let smtp_port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);
        Ok(Self {
            smtp_host,
            smtp_port,
            sender,
            password,
            default_recipient: std::env::var("EMAIL_RECIPIENT").ok(),
        })
    }
}

/// Search provider settings for the search source adapter.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub endpoint: String,
}

impl SearchConfig {
    /// Required: `EXA_API_KEY`. Optional: `EXA_ENDPOINT`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("EXA_API_KEY").context("EXA_API_KEY not set")?;
        let endpoint =
            std::env::var("EXA_ENDPOINT").unwrap_or_else(|_| DEFAULT_SEARCH_ENDPOINT.to_string());
        Ok(Self { api_key, endpoint })
    }
}
