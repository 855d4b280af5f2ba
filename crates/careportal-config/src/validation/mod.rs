//! Configuration validation.
//!
//! Each section has its own validator; this orchestrator runs them all and
//! collects errors into a single `ConfigError`.

mod helpers;
mod realtime;


use crate::schema::PortalConfig;
use careportal_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PortalConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    realtime::validate_endpoint(&mut errors, config);
    realtime::validate_heartbeat(&mut errors, config);
    realtime::validate_reconnect(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
