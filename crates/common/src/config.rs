//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Instance identity used in outbound mail.
    #[serde(default)]
    pub instance: InstanceConfig,
    /// SMTP configuration. Outbound mail is disabled when absent.
    #[serde(default)]
    pub mail: Option<MailConfig>,
    /// Background delivery configuration.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Visibility policy configuration.
    #[serde(default)]
    pub visibility: VisibilityConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`postgres://...` in production).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Instance identity.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Instance name shown in mail subjects and footers.
    #[serde(default = "default_instance_name")]
    pub name: String,
    /// Public URL of this instance.
    #[serde(default = "default_instance_url")]
    pub url: String,
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// SMTP host.
    pub host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Use TLS (relay mode). Plain connections are only meant for local relays.
    #[serde(default = "default_true")]
    pub use_tls: bool,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// From address.
    pub from_address: String,
    /// From display name.
    #[serde(default = "default_instance_name")]
    pub from_name: String,
}

/// Background delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Upper bound for a single outbound mail attempt, in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of concurrently running jobs.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Capacity of the job queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

/// Visibility policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisibilityConfig {
    /// Deny views and interactions between users when either blocked the other.
    #[serde(default)]
    pub enforce_blocks: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: default_instance_name(),
            url: default_instance_url(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_delivery_timeout(),
            workers: default_workers(),
            queue_size: default_queue_size(),
        }
    }
}

impl DeliveryConfig {
    /// Delivery timeout as a [`std::time::Duration`].
    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_instance_name() -> String {
    "SocialHub".to_string()
}

fn default_instance_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_true() -> bool {
    true
}

const fn default_delivery_timeout() -> u64 {
    10
}

const fn default_workers() -> usize {
    4
}

const fn default_queue_size() -> usize {
    1000
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `SOCIALHUB_ENV`)
    /// 4. Environment variables with `SOCIALHUB_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "Failed to read .env file");
        }

        let env = std::env::var("SOCIALHUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SOCIALHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
