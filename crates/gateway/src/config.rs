//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 3100)
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string; falls back to
//!   `DATABASE_URL`. When neither is set checkout state is kept in memory.
//! - `BAZAAR_PROVIDERS_FILE` - Provider capability records (default: config/providers.yaml)
//! - `BAZAAR_REGISTRY_TTL_SECS` - Capability cache lifetime (default: 60)
//! - `BAZAAR_PROVIDER_TIMEOUT_MS` - Per-provider call timeout (default: 3000)
//! - `BAZAAR_CHECKOUT_TTL_MINUTES` - Session lifetime at creation (default: 30)
//! - `BAZAAR_CHECKOUT_RENEWAL_MINUTES` - Expiry extension on address change (default: 15)
//! - `BAZAAR_HIGH_VALUE_THRESHOLD` - Totals above this need confirmation (default: 50000)
//! - `BAZAAR_TAX_RATE` - Checkout tax rate (default: 0.18)
//! - `BAZAAR_SHIPPING_BASE` - Shipping for the first unit (default: 50)
//! - `BAZAAR_SHIPPING_PER_EXTRA_UNIT` - Shipping per additional unit (default: 20)
//! - `BAZAAR_CURRENCY` - Checkout currency (default: INR)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bazaar_core::{CheckoutPricing, CurrencyCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid provider file {0}: {1}")]
    InvalidProviderFile(String, String),
}

/// Gateway application configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    pub registry: RegistryConfig,
    pub search: SearchConfig,
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Capability registry settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub providers_file: PathBuf,
    pub ttl: Duration,
}

/// Fan-out settings shared by search, compare, and detail lookups.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub provider_timeout: Duration,
}

/// Checkout pricing and lifetime settings.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutConfig {
    pub session_ttl: chrono::Duration,
    pub renewal: chrono::Duration,
    pub high_value_threshold: Decimal,
    pub currency: CurrencyCode,
    pub pricing: CheckoutPricing,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            providers_file: PathBuf::from("config/providers.yaml"),
            ttl: Duration::from_secs(60),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_millis(3000),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::minutes(30),
            renewal: chrono::Duration::minutes(15),
            high_value_threshold: Decimal::new(50_000, 0),
            currency: CurrencyCode::INR,
            pricing: CheckoutPricing::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("BAZAAR_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("BAZAAR_PORT", "3100")?;
        let database_url = get_optional_env("BAZAAR_DATABASE_URL")
            .or_else(|| get_optional_env("DATABASE_URL"))
            .map(SecretString::from);

        Ok(Self {
            host,
            port,
            database_url,
            registry: RegistryConfig::from_env()?,
            search: SearchConfig::from_env()?,
            checkout: CheckoutConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RegistryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            providers_file: PathBuf::from(get_env_or_default(
                "BAZAAR_PROVIDERS_FILE",
                "config/providers.yaml",
            )),
            ttl: Duration::from_secs(parse_env_or_default("BAZAAR_REGISTRY_TTL_SECS", "60")?),
        })
    }
}

impl SearchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            provider_timeout: Duration::from_millis(parse_env_or_default(
                "BAZAAR_PROVIDER_TIMEOUT_MS",
                "3000",
            )?),
        })
    }
}

impl CheckoutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            session_ttl: chrono::Duration::minutes(parse_env_or_default(
                "BAZAAR_CHECKOUT_TTL_MINUTES",
                "30",
            )?),
            renewal: chrono::Duration::minutes(parse_env_or_default(
                "BAZAAR_CHECKOUT_RENEWAL_MINUTES",
                "15",
            )?),
            high_value_threshold: parse_env_or_default("BAZAAR_HIGH_VALUE_THRESHOLD", "50000")?,
            currency: parse_env_or_default("BAZAAR_CURRENCY", "INR")?,
            pricing: CheckoutPricing {
                tax_rate: parse_env_or_default("BAZAAR_TAX_RATE", "0.18")?,
                shipping_base: parse_env_or_default("BAZAAR_SHIPPING_BASE", "50")?,
                shipping_per_extra_unit: parse_env_or_default(
                    "BAZAAR_SHIPPING_PER_EXTRA_UNIT",
                    "20",
                )?,
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable with a default value and parse it.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
