//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every section has serde defaults so a partial file works.

pub mod app;
pub mod cache;
pub mod database;
pub mod folders;
pub mod logging;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::cache::{CacheBackend, CacheConfig, MemoryCacheConfig, RedisCacheConfig};
pub use self::database::{DatabaseConfig, StoreBackend};
pub use self::folders::FolderConfig;
pub use self::logging::{LogFormat, LoggingConfig};

use crate::error::AppError;

/// Environment variable prefix for overrides, e.g. `KBHUB__SERVER__PORT=9000`.
const ENV_PREFIX: &str = "KBHUB";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// configuration (base file + environment overlay + environment variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache provider settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Folder hierarchy settings.
    #[serde(default)]
    pub folders: FolderConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config_path` with an optional `config/{env}` overlay and
    /// environment variables prefixed with `KBHUB__`. Missing files are
    /// not an error; every field has a default.
    pub fn load(config_path: &str, env: &str) -> Result<Self, AppError> {
        let base = config_path.trim_end_matches(".toml");

        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field limits that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.folders.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_section() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert_eq!(config.cache.provider, CacheBackend::Memory);
        assert_eq!(config.folders.max_depth, 100);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            backend = "memory"

            [folders]
            max_depth = 12
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.folders.max_depth, 12);
        assert_eq!(config.folders.tree_cache_ttl_seconds, 60);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [database]
            backend = "sqlite"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_sections_parse_lowercase() {
        let config = AppConfig::from_toml_str(
            r#"
            [cache]
            provider = "redis"

            [logging]
            format = "pretty"
            "#,
        )
        .expect("config should parse");
        assert_eq!(config.cache.provider, CacheBackend::Redis);
        assert_eq!(config.logging.format, LogFormat::Pretty);

        assert!(AppConfig::from_toml_str("[cache]\nprovider = \"memcached\"").is_err());
    }

    #[test]
    fn test_max_depth_must_fit_the_walk_limit() {
        let err = AppConfig::from_toml_str("[folders]\nmax_depth = 101").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains("between 1 and 100"));

        assert!(AppConfig::from_toml_str("[folders]\nmax_depth = 0").is_err());

        let config = AppConfig::from_toml_str("[folders]\nmax_depth = 100").unwrap();
        assert_eq!(config.folders.max_depth, FolderConfig::DEPTH_LIMIT);
    }
}
