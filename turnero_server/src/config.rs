//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use turnero::EngineConfig;
use turnero::db::DatabaseConfig;
use turnero::db::config::parse_env_or;

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Storage backend selected for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "TURNERO_STORAGE".to_string(),
                reason: format!("Unknown backend '{}', expected 'postgres' or 'memory'", other),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub storage: StorageBackend,
    /// Database configuration (used by the postgres backend)
    pub database: DatabaseConfig,
    /// Engine configuration
    pub engine: EngineConfig,
    /// Prometheus exporter address; disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Period of the elapsed-reservation closure task
    pub closure_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `storage_override` - Optional storage backend override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND", std::env::var("SERVER_BIND").ok())?
                .map_or_else(default_bind, Ok)?,
        };

        let storage = match storage_override {
            Some(storage) => storage,
            None => match std::env::var("TURNERO_STORAGE") {
                Ok(value) => value.parse()?,
                Err(_) => StorageBackend::Postgres,
            },
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let metrics_bind = parse_addr("METRICS_BIND", std::env::var("METRICS_BIND").ok())?;
        let closure_interval = Duration::from_secs(parse_env_or("CLOSURE_INTERVAL_SECS", 60));

        Ok(ServerConfig {
            bind,
            storage,
            database,
            engine: EngineConfig::from_env(),
            metrics_bind,
            closure_interval,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres && self.database.database_url.trim().is_empty()
        {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a PostgreSQL URL or run with TURNERO_STORAGE=memory".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.database.operation_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_OPERATION_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.closure_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "CLOSURE_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_addr(var: &str, value: Option<String>) -> Result<Option<SocketAddr>, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("'{}' is not an IP:PORT address", v),
            })
        })
        .transpose()
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("Default '{}' is not an address", DEFAULT_BIND),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            storage: StorageBackend::Memory,
            database: DatabaseConfig::development(),
            engine: EngineConfig::default(),
            metrics_bind: None,
            closure_interval: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use memory"));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" Postgres ".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_parse_addr() {
        assert_eq!(parse_addr("X", None).unwrap(), None);
        assert_eq!(parse_addr("X", Some("  ".into())).unwrap(), None);
        assert_eq!(
            parse_addr("X", Some("0.0.0.0:9090".into())).unwrap(),
            Some("0.0.0.0:9090".parse().unwrap())
        );
        assert!(matches!(
            parse_addr("X", Some("localhost".into())),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_pool_sizes() {
        let mut config = config();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_config_validation_postgres_requires_url() {
        let mut config = config();
        config.storage = StorageBackend::Postgres;
        config.database.database_url = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_config_validation_metrics_bind_clash() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = config();
        config.closure_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
