//! Runtime configuration, loaded from the environment at startup.

use std::time::Duration;

use anyhow::{Context, Result};

/// Everything the service needs to talk to its collaborators. Built once in
/// `main` and passed down explicitly; there are no hidden module-level
/// singletons.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Base URL of the Source Portal (campaigns, inventory, gift cards).
    pub source_api_base: String,
    /// Base URL of the payment-session service.
    pub checkout_api_base: String,
    pub tenant_id: String,
    pub api_key: String,
    /// Shared token expected on inbound webhook requests.
    pub webhook_token: String,
    pub gift_cards_enabled: bool,
    /// Per-call timeout for every collaborator request.
    pub collaborator_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let source_api_base = std::env::var("SOURCE_API_URL")
            .context("SOURCE_API_URL is required")?
            .trim_end_matches('/')
            .to_string();
        // The payment-session service usually lives behind the same portal.
        let checkout_api_base = std::env::var("CHECKOUT_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| source_api_base.clone());

        Ok(Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8083".to_string())
                .parse()
                .context("PORT must be a number")?,
            source_api_base,
            checkout_api_base,
            tenant_id: std::env::var("SOURCE_TENANT_ID").context("SOURCE_TENANT_ID is required")?,
            api_key: std::env::var("SOURCE_API_KEY").context("SOURCE_API_KEY is required")?,
            webhook_token: std::env::var("WEBHOOK_TOKEN").context("WEBHOOK_TOKEN is required")?,
            gift_cards_enabled: std::env::var("GIFT_CARDS_ENABLED")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
            collaborator_timeout_ms: std::env::var("COLLABORATOR_TIMEOUT_MS")
                .unwrap_or_else(|_| "2500".to_string())
                .parse()
                .context("COLLABORATOR_TIMEOUT_MS must be a number")?,
        })
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
