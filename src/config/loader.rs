//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. `DATABASE_URL`
//! 2. Environment variables (PAGEWARDEN__*)
//! 3. Configuration file (TOML)
//! 4. Default values

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "pagewarden.toml",
    ".pagewarden.toml",
    "~/.config/pagewarden/config.toml",
    "/etc/pagewarden/config.toml",
];

/// Upper bound accepted for `grants.max_batch_size`
pub const MAX_BATCH_SIZE_LIMIT: usize = 100;

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with PAGEWARDEN prefix
    // e.g., PAGEWARDEN__SERVER__PORT, PAGEWARDEN__GRANTS__MAX_BATCH_SIZE
    builder = builder.add_source(
        Environment::with_prefix("PAGEWARDEN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    // 4. DATABASE_URL wins over everything (common convention)
    if let Ok(url) = std::env::var("DATABASE_URL") {
        builder = builder
            .set_override("database.url", url)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.database.url.is_empty() {
        return Err(ConfigError::Missing {
            field: "database.url (set DATABASE_URL environment variable)".to_string(),
        });
    }

    if !config.database.url.starts_with("sqlite:") {
        return Err(ConfigError::Invalid {
            message: format!(
                "database.url must start with sqlite:, got: {}",
                config.database.url
            ),
        });
    }

    if config.database.max_connections == 0 {
        return Err(ConfigError::Invalid {
            message: "database.max_connections must be greater than 0".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    if !(1..=MAX_BATCH_SIZE_LIMIT).contains(&config.grants.max_batch_size) {
        return Err(ConfigError::Invalid {
            message: format!(
                "grants.max_batch_size must be between 1 and {}, got: {}",
                MAX_BATCH_SIZE_LIMIT, config.grants.max_batch_size
            ),
        });
    }

    Ok(())
}
