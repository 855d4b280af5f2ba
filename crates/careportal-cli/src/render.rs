//! Terminal rendering for session events and toasts.

use careportal_common::{Toast, ToastLevel};
use careportal_realtime::{ChatMessage, PortalNotification, SessionEvent};
use chrono::{DateTime, Local};

/// One printable line for `event`, prefixed with `now` as `HH:MM:SS`.
pub fn event_line(now: DateTime<Local>, event: &SessionEvent) -> String {
    let stamp = now.format("%H:%M:%S");
    match event {
        SessionEvent::StatusChanged(status) => {
            format!("{stamp} * connection {}", status_label(*status))
        }
        SessionEvent::Notification(notification) => {
            format!("{stamp} ! {}", notification_text(notification))
        }
        SessionEvent::ChatMessage {
            conversation_id,
            message,
        } => format!(
            "{stamp} [chat {conversation_id}] {}: {}",
            sender_label(message),
            message.message_content
        ),
        SessionEvent::EmergencyMessage {
            channel_id,
            message,
        } => format!(
            "{stamp} [emergency {channel_id}] {}: {}",
            sender_label(message),
            message.message_content
        ),
        SessionEvent::Typing(typing) => {
            let verb = if typing.is_typing {
                "is typing..."
            } else {
                "stopped typing"
            };
            format!(
                "{stamp} [chat {}] user {} {verb}",
                typing.conversation_id, typing.user_id
            )
        }
    }
}

pub fn toast_line(toast: &Toast) -> String {
    let tag = match toast.level {
        ToastLevel::Info => "info",
        ToastLevel::Success => "ok",
        ToastLevel::Warning => "warn",
        ToastLevel::Error => "error",
    };
    format!("({tag}) {}", toast.message)
}

fn status_label(status: careportal_realtime::SessionStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("{status:?}"))
}

fn sender_label(message: &ChatMessage) -> String {
    match (&message.sender_name, message.sender_id) {
        (Some(name), _) => name.clone(),
        (None, Some(id)) => format!("user {id}"),
        (None, None) => "unknown".to_string(),
    }
}

/// Notifications without display text fall back to their raw JSON.
fn notification_text(notification: &PortalNotification) -> String {
    match notification.text() {
        Some(text) => text.to_string(),
        None => serde_json::to_string(notification).unwrap_or_default(),
    }
}
