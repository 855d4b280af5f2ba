//! CarePortal configuration.
//!
//! TOML-based configuration for the realtime client and logging. Every
//! section uses serde defaults, so a partial (or empty) file is valid.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use careportal_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.realtime.endpoint);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, LoggingConfig, PortalConfig, RealtimeSettings, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{load_default, load_from_path, parse_config};

use careportal_common::ConfigError;

/// Load config from the platform default path and validate it.
///
/// Creates a commented default file when none exists.
pub fn load_config() -> Result<PortalConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &PortalConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
