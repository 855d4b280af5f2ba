//! Configuration schema types for CarePortal.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod realtime;

pub use logging::*;
pub use realtime::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    pub realtime: RealtimeSettings,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_correct_realtime() {
        let config = PortalConfig::default();
        assert_eq!(config.realtime.endpoint, "ws://localhost:8080/ws");
        assert_eq!(config.realtime.heartbeat_incoming_ms, 4000);
        assert_eq!(config.realtime.heartbeat_outgoing_ms, 4000);
        assert_eq!(config.realtime.reconnect_base_delay_ms, 1000);
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.realtime.connect_timeout_secs, 15);
    }

    #[test]
    fn default_config_has_correct_logging() {
        let config = PortalConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.filter_directive(), "careportal=info");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: PortalConfig = toml::from_str("").unwrap();
        assert_eq!(config.realtime.endpoint, "ws://localhost:8080/ws");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_realtime_section() {
        let config: PortalConfig = toml::from_str(
            r#"
[realtime]
endpoint = "wss://portal.example.org/ws"
max_reconnect_attempts = 8
"#,
        )
        .unwrap();
        assert_eq!(config.realtime.endpoint, "wss://portal.example.org/ws");
        assert_eq!(config.realtime.max_reconnect_attempts, 8);
        assert_eq!(config.realtime.reconnect_base_delay_ms, 1000);
    }

    #[test]
    fn log_level_uses_uppercase_names() {
        let config: PortalConfig = toml::from_str(
            r#"
[logging]
level = "WARNING"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.logging.filter_directive(), "careportal=warn");
    }
}
