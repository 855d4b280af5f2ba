//! Validation for the `[realtime]` section.

use crate::schema::PortalConfig;

use super::helpers::{validate_range, validate_range_or_zero};

/// The endpoint must be a `ws://` or `wss://` URL with a host.
pub(crate) fn validate_endpoint(errors: &mut Vec<String>, config: &PortalConfig) {
    let endpoint = config.realtime.endpoint.trim();
    let rest = endpoint
        .strip_prefix("ws://")
        .or_else(|| endpoint.strip_prefix("wss://"));

    match rest {
        None => errors.push(format!(
            "realtime.endpoint = {endpoint:?} must start with ws:// or wss://"
        )),
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or_default();
            if host.is_empty() {
                errors.push(format!("realtime.endpoint = {endpoint:?} has no host"));
            }
        }
    }
}

pub(crate) fn validate_heartbeat(errors: &mut Vec<String>, config: &PortalConfig) {
    validate_range_or_zero(
        errors,
        "realtime.heartbeat_incoming_ms",
        config.realtime.heartbeat_incoming_ms,
        1000,
        60_000,
    );
    validate_range_or_zero(
        errors,
        "realtime.heartbeat_outgoing_ms",
        config.realtime.heartbeat_outgoing_ms,
        1000,
        60_000,
    );
}

pub(crate) fn validate_reconnect(errors: &mut Vec<String>, config: &PortalConfig) {
    validate_range(
        errors,
        "realtime.reconnect_base_delay_ms",
        config.realtime.reconnect_base_delay_ms,
        100,
        60_000,
    );
    validate_range(
        errors,
        "realtime.max_reconnect_attempts",
        config.realtime.max_reconnect_attempts,
        0,
        20,
    );
    validate_range(
        errors,
        "realtime.connect_timeout_secs",
        config.realtime.connect_timeout_secs,
        1,
        120,
    );
}
