//! Reading `[realtime]` and `[logging]` settings from TOML.

use crate::schema::PortalConfig;
use crate::validation;
use careportal_common::ConfigError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Parse config text. Absent sections and keys take their defaults.
pub fn parse_config(content: &str) -> Result<PortalConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("invalid TOML: {e}")))
}

/// Load the config file at `path`.
///
/// Out-of-range values (a zero reconnect delay, a non-websocket endpoint)
/// are reported as a warning and kept, so a typo does not stop the client
/// from starting; use [`crate::load_config`] for a strict load.
pub fn load_from_path(path: &Path) -> Result<PortalConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("cannot read {}: {e}", path.display())),
    })?;

    let config = parse_config(&content)?;
    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "{e}");
    }

    info!(
        path = %path.display(),
        endpoint = %config.realtime.endpoint,
        "loaded portal config"
    );
    Ok(config)
}

/// Load from [`default_config_path`], writing the commented template and
/// returning defaults on first run.
pub fn load_default() -> Result<PortalConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(PortalConfig::default())
        }
        other => other,
    }
}
