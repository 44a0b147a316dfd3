use chrono::{DateTime, Utc};
use notification_store::{Notification, NotificationType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a subscribed client receives for each notification.
///
/// Clients depend on this exact field set: `{id, title, message, type, createdAt}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    /// Notification id
    pub id: Uuid,
    /// Notification title
    pub title: String,
    /// Notification message
    pub message: String,
    /// Notification type
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// When the notification was stored
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for PushPayload {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            notification_type: notification.notification_type,
            created_at: notification.created_at,
        }
    }
}

/// Tuning for the push registry.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Payloads queued per session before new ones are dropped (default: 32)
    pub session_buffer: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self { session_buffer: 32 }
    }
}
