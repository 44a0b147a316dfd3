use notification_store::{Notification, NotificationData, NotificationError, NotificationType};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string for paginated listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    pub page: Option<u32>,
    /// Page size (default: 20)
    pub limit: Option<u32>,
}

/// Pagination block of a listing response
#[derive(Debug, Serialize)]
pub struct Pagination {
    /// Total notifications for the user
    pub total: u64,
    /// Current page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Number of pages
    pub pages: u64,
}

/// Response for a user's paginated notifications
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    /// Notifications on this page, newest first
    pub data: Vec<Notification>,
    /// Pagination details
    pub pagination: Pagination,
}

/// Wrapper for unpaginated listings
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    /// Payload
    pub data: T,
}

/// Response for the unread badge
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    /// Unread notifications for the user
    pub unread_count: u64,
}

/// Request body for `POST /trigger/request-received`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestReceivedRequest {
    /// Owner of the requested book
    #[validate(length(min = 1, message = "ownerId is required"))]
    pub owner_id: String,

    /// Display name of the requester
    #[validate(length(min = 1, message = "requesterName is required"))]
    pub requester_name: String,

    /// Title of the requested book
    #[validate(length(min = 1, message = "bookTitle is required"))]
    pub book_title: String,

    /// `borrow` or `swap`
    #[validate(length(min = 1, message = "requestType is required"))]
    pub request_type: String,

    /// Request the notification refers to
    pub request_id: Option<String>,

    /// Extra context stored with the notification
    pub data: NotificationData,
}

/// Request body for `POST /trigger/approved` and `POST /trigger/rejected`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDecisionRequest {
    /// User who made the request
    #[validate(length(min = 1, message = "requesterId is required"))]
    pub requester_id: String,

    /// Title of the requested book
    #[validate(length(min = 1, message = "bookTitle is required"))]
    pub book_title: String,

    /// `borrow` or `swap`
    #[validate(length(min = 1, message = "requestType is required"))]
    pub request_type: String,

    /// Request the notification refers to
    pub request_id: Option<String>,

    /// Extra context stored with the notification
    pub data: NotificationData,
}

/// Request body for `POST /trigger/returned`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct BookReturnedRequest {
    /// Owner of the returned book
    #[validate(length(min = 1, message = "ownerId is required"))]
    pub owner_id: String,

    /// Display name of the borrower returning it
    #[validate(length(min = 1, message = "returnerName is required"))]
    pub returner_name: String,

    /// Title of the returned book
    #[validate(length(min = 1, message = "bookTitle is required"))]
    pub book_title: String,

    /// Request the notification refers to
    pub request_id: Option<String>,

    /// Extra context stored with the notification
    pub data: NotificationData,
}

/// Request body for `POST /trigger/due-date`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct DueDateReminderRequest {
    /// Borrower of the book
    #[validate(length(min = 1, message = "borrowerId is required"))]
    pub borrower_id: String,

    /// Title of the borrowed book
    #[validate(length(min = 1, message = "bookTitle is required"))]
    pub book_title: String,

    /// Due date as shown to the user
    #[validate(length(min = 1, message = "dueDate is required"))]
    pub due_date: String,

    /// Request the notification refers to
    pub request_id: Option<String>,

    /// Extra context stored with the notification
    pub data: NotificationData,
}

/// Request body for `POST /bulk`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationRequest {
    /// Recipients
    #[serde(default)]
    #[validate(length(min = 1, message = "userIds must not be empty"))]
    pub user_ids: Vec<String>,

    /// Short headline
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    /// Body text
    #[serde(default)]
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,

    /// Event type (default: general)
    #[serde(rename = "type", default = "default_bulk_type")]
    pub notification_type: String,
}

fn default_bulk_type() -> String {
    NotificationType::General.as_str().to_string()
}

/// Response for `POST /bulk`
#[derive(Debug, Serialize)]
pub struct BulkNotificationResponse {
    /// Number of notifications created
    pub created: usize,
    /// The created notifications
    pub data: Vec<Notification>,
}

/// Validates a request body, mapping failures to a validation error.
pub(crate) fn validated<T: Validate>(request: T) -> Result<T, NotificationError> {
    request.validate()?;
    Ok(request)
}

/// Folds an optional `requestId` into the caller's data.
pub(crate) fn with_request_id(
    mut data: NotificationData,
    request_id: Option<String>,
) -> NotificationData {
    if let Some(request_id) = request_id {
        data.insert("requestId".to_string(), serde_json::Value::String(request_id));
    }
    data
}
