use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Domain context attached to a notification (e.g. `bookTitle`, `requestId`).
pub type NotificationData = serde_json::Map<String, serde_json::Value>;

/// The closed set of events a user can be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Someone asked to borrow or swap one of the user's books.
    RequestSent,
    /// The user's request was approved by the owner.
    RequestApproved,
    /// The user's request was rejected by the owner.
    RequestRejected,
    /// A borrowed book came back to its owner.
    BookReturned,
    /// A borrowed book is due soon.
    DueDateReminder,
    /// Announcements and anything else.
    General,
}

impl NotificationType {
    /// Every variant, in declaration order.
    pub const ALL: [NotificationType; 6] = [
        NotificationType::RequestSent,
        NotificationType::RequestApproved,
        NotificationType::RequestRejected,
        NotificationType::BookReturned,
        NotificationType::DueDateReminder,
        NotificationType::General,
    ];

    /// Wire name, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::RequestSent => "request_sent",
            NotificationType::RequestApproved => "request_approved",
            NotificationType::RequestRejected => "request_rejected",
            NotificationType::BookReturned => "book_returned",
            NotificationType::DueDateReminder => "due_date_reminder",
            NotificationType::General => "general",
        }
    }

    /// Human-readable label shown in emails.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationType::RequestSent => "New Request",
            NotificationType::RequestApproved => "Request Approved",
            NotificationType::RequestRejected => "Request Rejected",
            NotificationType::BookReturned => "Book Returned",
            NotificationType::DueDateReminder => "Due Date Reminder",
            NotificationType::General => "Notification",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| NotificationError::Validation(format!("Unknown notification type: {}", s)))
    }
}

/// A durable record of one event relevant to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique identifier
    pub id: Uuid,
    /// Recipient of the notification
    pub user_id: String,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Event type
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Domain context
    #[serde(default)]
    pub data: NotificationData,
    /// Whether the recipient has read it
    pub is_read: bool,
    /// Whether the recipient should get this by email; retries skip it otherwise
    #[serde(default = "wants_email_default")]
    pub wants_email: bool,
    /// Whether an email was handed off to the mail transport
    pub email_sent: bool,
    /// Whether the realtime payload reached at least one live session
    pub push_sent: bool,
    /// When the notification was stored
    pub created_at: DateTime<Utc>,
    /// When the notification was last mutated
    pub updated_at: DateTime<Utc>,
}

/// Input for [`crate::NotificationStore::create`].
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    /// Recipient of the notification
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,

    /// Short headline
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    /// Body text
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,

    /// Event type
    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    /// Domain context
    #[serde(default)]
    pub data: NotificationData,

    /// Whether to deliver by email (default: true)
    #[serde(default = "wants_email_default")]
    pub wants_email: bool,
}

fn wants_email_default() -> bool {
    true
}

impl NewNotification {
    /// Builds a record with empty `data`.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            notification_type,
            data: NotificationData::new(),
            wants_email: true,
        }
    }

    /// Attaches domain context.
    pub fn with_data(mut self, data: NotificationData) -> Self {
        self.data = data;
        self
    }

    /// Marks the record as push-only, so no email is ever attempted for it.
    pub fn without_email(mut self) -> Self {
        self.wants_email = false;
        self
    }

    /// Trims surrounding whitespace and validates required fields.
    pub fn normalized(mut self) -> Result<Self, NotificationError> {
        self.user_id = self.user_id.trim().to_string();
        self.title = self.title.trim().to_string();
        self.message = self.message.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    /// Materializes the record with a fresh id and the given creation time.
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            notification_type: self.notification_type,
            data: self.data,
            is_read: false,
            wants_email: self.wants_email,
            email_sent: false,
            push_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One page of a user's notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    /// Notifications on this page, newest first
    pub items: Vec<Notification>,
    /// Total notifications for the user across all pages
    pub total: u64,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub page_size: u32,
}

impl NotificationPage {
    /// Number of pages needed to show `total` items.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size.max(1)))
    }
}

/// Store-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    /// All stored notifications
    pub total: u64,
    /// Notifications not yet read
    pub unread: u64,
    /// Count per type; every type is present
    pub by_type: BTreeMap<NotificationType, u64>,
    /// Notifications created in the last 24 hours
    pub last_24_hours: u64,
}

/// Custom error type for notification operations
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// No notification with the given id
    #[error("Notification not found")]
    NotFound,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ValidationErrors> for NotificationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        NotificationError::Validation(messages.join(", "))
    }
}

impl actix_web::ResponseError for NotificationError {
    fn error_response(&self) -> actix_web::HttpResponse {
        use actix_web::HttpResponse;

        match self {
            NotificationError::Validation(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "validation_error",
                    "message": msg
                }))
            }
            NotificationError::NotFound => HttpResponse::NotFound().json(serde_json::json!({
                "error": "notification_not_found",
                "message": "Notification not found"
            })),
            NotificationError::Database(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}
