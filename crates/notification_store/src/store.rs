use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::*;

/// Durable CRUD over notification records.
///
/// Every method is individually atomic; implementations hold no lock across
/// calls, so background sweeps and request traffic can interleave freely.
/// The store is the only component allowed to change `is_read`,
/// `email_sent` and `push_sent`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Validates and stores a new notification, assigning its id and timestamps.
    async fn create(&self, record: NewNotification) -> Result<Notification, NotificationError>;

    /// Fetches one notification.
    async fn get(&self, id: &Uuid) -> Result<Notification, NotificationError>;

    /// Lists a user's notifications newest first. `page` and `page_size` are
    /// 1-based; a page past the end is empty rather than an error.
    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<NotificationPage, NotificationError>;

    /// Number of unread notifications for a user.
    async fn unread_count(&self, user_id: &str) -> Result<u64, NotificationError>;

    /// Marks a notification as read. Already-read notifications are returned unchanged.
    async fn mark_read(&self, id: &Uuid) -> Result<Notification, NotificationError>;

    /// Marks every unread notification of a user as read, returning how many changed.
    async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError>;

    /// Records that the email for this notification was handed off.
    async fn mark_email_sent(&self, id: &Uuid) -> Result<(), NotificationError>;

    /// Records that the realtime payload reached at least one session.
    async fn mark_push_sent(&self, id: &Uuid) -> Result<(), NotificationError>;

    /// Deletes one notification.
    async fn delete(&self, id: &Uuid) -> Result<(), NotificationError>;

    /// Deletes the given notifications, skipping unknown ids. Returns how many were removed.
    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, NotificationError>;

    /// Deletes every notification of a user.
    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, NotificationError>;

    /// A user's notifications of one type, newest first.
    async fn list_by_type(
        &self,
        user_id: &str,
        notification_type: NotificationType,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Notifications created strictly before `cutoff`, optionally only read ones.
    async fn find_older_than(
        &self,
        cutoff: DateTime<Utc>,
        only_read: bool,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Notifications that want an email which has not gone out, created in
    /// `[since, until)`, oldest first, at most `limit` of them.
    async fn find_unsent_email(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>, NotificationError>;

    /// Store-wide counters relative to `now`.
    async fn stats(&self, now: DateTime<Utc>) -> Result<NotificationStats, NotificationError>;
}

/// Rejects zero page numbers and page sizes.
pub(crate) fn check_page(page: u32, page_size: u32) -> Result<(), NotificationError> {
    if page == 0 {
        return Err(NotificationError::Validation(
            "page must be a positive integer".to_string(),
        ));
    }
    if page_size == 0 {
        return Err(NotificationError::Validation(
            "pageSize must be a positive integer".to_string(),
        ));
    }
    Ok(())
}
