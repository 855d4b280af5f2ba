//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# CarePortal Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[realtime]
# endpoint = "ws://localhost:8080/ws"
# heartbeat_incoming_ms = 4000      # 0 disables, otherwise 1000-60000
# heartbeat_outgoing_ms = 4000      # 0 disables, otherwise 1000-60000
# reconnect_base_delay_ms = 1000    # 100-60000, doubles per attempt
# max_reconnect_attempts = 5        # 0-20
# connect_timeout_secs = 15         # 1-120

[logging]
# level = "INFO"                    # DEBUG, INFO, WARNING, ERROR
"##
}
