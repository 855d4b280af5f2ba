//! Where the portal client keeps its config file.

use careportal_common::ConfigError;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::template::default_config_toml;

/// Environment variable that points the client at a specific config file.
pub const CONFIG_PATH_ENV: &str = "CAREPORTAL_CONFIG";

/// `$CAREPORTAL_CONFIG` when set, else `<config dir>/careportal/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

pub(crate) fn resolve_config_path(
    override_path: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let config_dir = config_dir.ok_or_else(|| {
        ConfigError::ParseError(format!(
            "no platform config directory; set {CONFIG_PATH_ENV} to a config file"
        ))
    })?;
    Ok(config_dir.join("careportal").join("config.toml"))
}

/// Write the commented template to `path`, creating parent directories.
///
/// An existing file is left untouched, so two clients starting at once
/// cannot clobber a file the user already edited.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "config file appeared concurrently; keeping it");
            return Ok(());
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot create {}: {e}",
                path.display()
            )))
        }
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| ConfigError::ParseError(format!("cannot write {}: {e}", path.display())))?;

    info!(path = %path.display(), "wrote default portal config");
    Ok(())
}
