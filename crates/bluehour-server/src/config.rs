//! Server Configuration
//!
//! Read once at startup. Provider, database and payment settings live with
//! their own crates (`GeminiConfig`, `DatabaseConfig`, the processor
//! clients); this covers what the server itself decides.

use bluehour_ledger::{AccountingPolicy, FREE_LIMIT, REQUIRED_CREDITS};
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_APP_URL: &str = "http://localhost:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Public base URL used for checkout redirects
    pub app_url: String,

    /// Free generations per user
    pub free_limit: i32,

    /// Credits charged per paid generation
    pub required_credits: i32,

    pub accounting: AccountingPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            app_url: DEFAULT_APP_URL.into(),
            free_limit: FREE_LIMIT,
            required_credits: REQUIRED_CREDITS,
            accounting: AccountingPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let accounting = match get("LEDGER_ACCOUNTING") {
            Some(value) => AccountingPolicy::parse(&value).ok_or(ConfigError::Invalid {
                key: "LEDGER_ACCOUNTING",
                value,
            })?,
            None => defaults.accounting,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            app_url: get("PUBLIC_APP_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.app_url),
            free_limit: non_negative(get("FREE_LIMIT"), "FREE_LIMIT", defaults.free_limit)?,
            required_credits: non_negative(
                get("REQUIRED_CREDITS"),
                "REQUIRED_CREDITS",
                defaults.required_credits,
            )?,
            accounting,
        })
    }
}

fn non_negative(value: Option<String>, key: &'static str, default: i32) -> Result<i32, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<i32>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}
