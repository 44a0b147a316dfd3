use std::sync::Arc;

use notification_store::{
    NewNotification, Notification, NotificationData, NotificationError, NotificationStore,
    NotificationType,
};
use realtime_push::{PushPayload, PushRegistry};
use serde_json::Value;

use crate::email::EmailSender;

/// Creates notifications and fans them out to the delivery channels.
///
/// The stored record is the source of truth: once `create` succeeds the call
/// succeeds, whatever happens on the push and email channels.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    push: Arc<PushRegistry>,
    email: Option<Arc<dyn EmailSender>>,
}

impl Dispatcher {
    /// Create a new dispatcher. Without an email sender no email is attempted.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        push: Arc<PushRegistry>,
        email: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        Self { store, push, email }
    }

    /// The store notifications are written to.
    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    /// Stores a notification, pushes it to live sessions and optionally emails it.
    pub async fn notify(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        notification_type: NotificationType,
        data: NotificationData,
        want_email: bool,
    ) -> Result<Notification, NotificationError> {
        let mut record =
            NewNotification::new(user_id, title, message, notification_type).with_data(data);
        if !want_email {
            record = record.without_email();
        }
        let mut notification = self.store.create(record).await?;

        let delivered = self
            .push
            .publish(&notification.user_id, &PushPayload::from(&notification));
        if delivered > 0 {
            match self.store.mark_push_sent(&notification.id).await {
                Ok(()) => notification.push_sent = true,
                Err(e) => log::error!("Failed to record push for {}: {}", notification.id, e),
            }
        }

        if let Some(email) = self.email.as_ref().filter(|_| want_email) {
            let sent = email
                .send(
                    &notification.user_id,
                    &notification.title,
                    &notification.message,
                    notification.notification_type,
                )
                .await;

            if sent {
                match self.store.mark_email_sent(&notification.id).await {
                    Ok(()) => notification.email_sent = true,
                    Err(e) => log::error!("Failed to record email for {}: {}", notification.id, e),
                }
            } else {
                log::warn!(
                    "Email for notification {} not sent, leaving it for the retry sweep",
                    notification.id
                );
            }
        }

        log::info!(
            "🔔 Notification {} ({}) created for user {}",
            notification.id,
            notification.notification_type,
            notification.user_id
        );
        Ok(notification)
    }

    /// Tells a book owner that someone wants to borrow or swap their book.
    pub async fn request_received(
        &self,
        owner_id: &str,
        requester_name: &str,
        book_title: &str,
        request_type: &str,
        data: NotificationData,
    ) -> Result<Notification, NotificationError> {
        require(&[
            ("ownerId", owner_id),
            ("requesterName", requester_name),
            ("bookTitle", book_title),
            ("requestType", request_type),
        ])?;

        let message = format!(
            "{} requested to {} your book \"{}\"",
            requester_name, request_type, book_title
        );
        let data = merge_data(
            &[
                ("bookTitle", book_title),
                ("requesterName", requester_name),
                ("requestType", request_type),
            ],
            data,
        );

        self.notify(
            owner_id,
            "New Request Received",
            &message,
            NotificationType::RequestSent,
            data,
            true,
        )
        .await
    }

    /// Tells a requester their request was approved.
    pub async fn request_approved(
        &self,
        requester_id: &str,
        book_title: &str,
        request_type: &str,
        data: NotificationData,
    ) -> Result<Notification, NotificationError> {
        require(&[
            ("requesterId", requester_id),
            ("bookTitle", book_title),
            ("requestType", request_type),
        ])?;

        let message = format!(
            "Your {} request for \"{}\" has been approved!",
            request_type, book_title
        );
        let data = merge_data(
            &[("bookTitle", book_title), ("requestType", request_type)],
            data,
        );

        self.notify(
            requester_id,
            "Request Approved",
            &message,
            NotificationType::RequestApproved,
            data,
            true,
        )
        .await
    }

    /// Tells a requester their request was rejected.
    pub async fn request_rejected(
        &self,
        requester_id: &str,
        book_title: &str,
        request_type: &str,
        data: NotificationData,
    ) -> Result<Notification, NotificationError> {
        require(&[
            ("requesterId", requester_id),
            ("bookTitle", book_title),
            ("requestType", request_type),
        ])?;

        let message = format!(
            "Your {} request for \"{}\" has been rejected.",
            request_type, book_title
        );
        let data = merge_data(
            &[("bookTitle", book_title), ("requestType", request_type)],
            data,
        );

        self.notify(
            requester_id,
            "Request Rejected",
            &message,
            NotificationType::RequestRejected,
            data,
            true,
        )
        .await
    }

    /// Tells a book owner their book came back.
    pub async fn book_returned(
        &self,
        owner_id: &str,
        returner_name: &str,
        book_title: &str,
        data: NotificationData,
    ) -> Result<Notification, NotificationError> {
        require(&[
            ("ownerId", owner_id),
            ("returnerName", returner_name),
            ("bookTitle", book_title),
        ])?;

        let message = format!("{} has returned your book \"{}\"", returner_name, book_title);
        let data = merge_data(
            &[("bookTitle", book_title), ("returnerName", returner_name)],
            data,
        );

        self.notify(
            owner_id,
            "Book Returned",
            &message,
            NotificationType::BookReturned,
            data,
            true,
        )
        .await
    }

    /// Reminds a borrower that a book is due.
    pub async fn due_date_reminder(
        &self,
        borrower_id: &str,
        book_title: &str,
        due_date: &str,
        data: NotificationData,
    ) -> Result<Notification, NotificationError> {
        require(&[
            ("borrowerId", borrower_id),
            ("bookTitle", book_title),
            ("dueDate", due_date),
        ])?;

        let message = format!("Your borrowed book \"{}\" is due on {}", book_title, due_date);
        let data = merge_data(&[("bookTitle", book_title), ("dueDate", due_date)], data);

        self.notify(
            borrower_id,
            "Due Date Reminder",
            &message,
            NotificationType::DueDateReminder,
            data,
            true,
        )
        .await
    }

    /// Sends the same announcement to many users, without email.
    ///
    /// Every user id is checked before anything is stored.
    pub async fn notify_many(
        &self,
        user_ids: &[String],
        title: &str,
        message: &str,
        notification_type: NotificationType,
    ) -> Result<Vec<Notification>, NotificationError> {
        if user_ids.is_empty() {
            return Err(NotificationError::Validation(
                "userIds must not be empty".to_string(),
            ));
        }
        if user_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(NotificationError::Validation(
                "userIds must not contain empty ids".to_string(),
            ));
        }
        require(&[("title", title), ("message", message)])?;

        let mut created = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let notification = self
                .notify(
                    user_id,
                    title,
                    message,
                    notification_type,
                    NotificationData::new(),
                    false,
                )
                .await?;
            created.push(notification);
        }

        log::info!("📢 Bulk notification sent to {} users", created.len());
        Ok(created)
    }
}

fn require(fields: &[(&str, &str)]) -> Result<(), NotificationError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(NotificationError::Validation(format!("{} is required", name))),
        None => Ok(()),
    }
}

/// Trigger keys first, then caller data on top.
fn merge_data(own: &[(&str, &str)], extra: NotificationData) -> NotificationData {
    let mut data: NotificationData = own
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    data.extend(extra);
    data
}
