//! Server configuration module.
//!
//! Layered with the `config` crate, later sources overriding earlier ones:
//!
//! ```text
//!   built-in defaults  ──►  haze.toml (optional)  ──►  HAZE_* environment
//! ```
//!
//! e.g. `HAZE_PORT=9000 HAZE_JWT_SECRET=... haze-api`

use std::net::SocketAddr;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Secret used when none is configured. Fine for local development only.
pub const DEV_JWT_SECRET: &str = "haze-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, e.g. `0.0.0.0`
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Shown on the health endpoint and in client headers
    pub store_name: String,

    pub currency_symbol: String,

    /// Admin login created on first start when no users exist
    pub bootstrap_admin_email: String,

    pub bootstrap_admin_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            database_path: "haze.db".to_string(),
            max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 12 * 60 * 60,
            store_name: "Haze Vape Shop".to_string(),
            currency_symbol: "৳".to_string(),
            bootstrap_admin_email: "admin@haze.local".to_string(),
            bootstrap_admin_password: "change-me-please".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads `haze.toml` (if present) and `HAZE_*` variables over the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("haze")
    }

    /// Same as [`Self::load`] with an explicit file stem or path.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let settings = Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_lifetime_secs", defaults.jwt_lifetime_secs)?
            .set_default("store_name", defaults.store_name)?
            .set_default("currency_symbol", defaults.currency_symbol)?
            .set_default("bootstrap_admin_email", defaults.bootstrap_admin_email)?
            .set_default("bootstrap_admin_password", defaults.bootstrap_admin_password)?
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix("HAZE"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue("jwt_secret".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_lifetime_secs".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        Ok(())
    }

    /// Socket address to listen on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("bind_addr".to_string()))
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.uses_dev_secret());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ServerConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.store_name, "Haze Vape Shop");
    }

    #[test]
    fn test_rejects_bad_values() {
        let empty_secret = ServerConfig {
            jwt_secret: "  ".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            empty_secret.validate(),
            Err(ConfigError::InvalidValue(_))
        ));

        let no_lifetime = ServerConfig {
            jwt_lifetime_secs: 0,
            ..ServerConfig::default()
        };
        assert!(no_lifetime.validate().is_err());

        let bad_addr = ServerConfig {
            bind_addr: "not an address".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad_addr.socket_addr().is_err());
    }
}
