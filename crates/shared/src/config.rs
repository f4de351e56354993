//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Card payment gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key shared with the identity provider.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    3600 // 1 hour
}

/// Payment-intent gateway configuration.
///
/// Injected into the gateway client and the registration page; nothing
/// reads these values from ambient state.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Secret API key used server-side.
    #[serde(default)]
    pub secret_key: String,
    /// Publishable key handed to the browser checkout form.
    #[serde(default)]
    pub publishable_key: String,
    /// Base URL of the gateway API.
    #[serde(default = "default_gateway_base_url")]
    pub api_base_url: String,
    /// ISO 4217 currency code (lowercase) charged for card payments.
    #[serde(default = "default_gateway_currency")]
    pub currency: String,
    /// Request timeout in seconds.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

fn default_gateway_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_gateway_currency() -> String {
    "bob".to_string()
}

fn default_gateway_timeout() -> u64 {
    15
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            publishable_key: String::new(),
            api_base_url: default_gateway_base_url(),
            currency: default_gateway_currency(),
            timeout_secs: default_gateway_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Returns true when a secret key is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &"[hidden]")
            .field("publishable_key", &self.publishable_key)
            .field("api_base_url", &self.api_base_url)
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CASEBILL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
