use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{NotificationStore, check_page};
use crate::types::*;

/// In-process notification store.
///
/// Records are kept in insertion order behind a single async lock, which makes
/// each operation atomic. Used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole content of the store, e.g. when rehydrating from a snapshot.
    ///
    /// Unlike the [`NotificationStore`] operations this writes records verbatim,
    /// read state and timestamps included.
    pub async fn restore(&self, records: Vec<Notification>) {
        *self.records.write().await = records;
    }

    /// Copy of every stored record, in insertion order.
    pub async fn snapshot(&self) -> Vec<Notification> {
        self.records.read().await.clone()
    }

    /// Newest first; ties keep the most recently inserted first.
    fn newest_first<'a>(records: impl DoubleEndedIterator<Item = &'a Notification>) -> Vec<Notification> {
        let mut items: Vec<Notification> = records.rev().cloned().collect();
        items.sort_by_key(|n| Reverse(n.created_at));
        items
    }

    async fn update<F>(&self, id: &Uuid, apply: F) -> Result<Notification, NotificationError>
    where
        F: FnOnce(&mut Notification) -> bool + Send,
    {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|n| n.id == *id)
            .ok_or(NotificationError::NotFound)?;

        if apply(record) {
            record.updated_at = Utc::now();
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, record: NewNotification) -> Result<Notification, NotificationError> {
        let notification = record.normalized()?.into_notification(Utc::now());
        self.records.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn get(&self, id: &Uuid) -> Result<Notification, NotificationError> {
        self.records
            .read()
            .await
            .iter()
            .find(|n| n.id == *id)
            .cloned()
            .ok_or(NotificationError::NotFound)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<NotificationPage, NotificationError> {
        check_page(page, page_size)?;

        let records = self.records.read().await;
        let all = Self::newest_first(records.iter().filter(|n| n.user_id == user_id));
        let total = all.len() as u64;
        let skip = (page as usize - 1).saturating_mul(page_size as usize);

        Ok(NotificationPage {
            items: all.into_iter().skip(skip).take(page_size as usize).collect(),
            total,
            page,
            page_size,
        })
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64, NotificationError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, id: &Uuid) -> Result<Notification, NotificationError> {
        self.update(id, |n| !std::mem::replace(&mut n.is_read, true))
            .await
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut updated = 0;

        for record in records
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            record.is_read = true;
            record.updated_at = now;
            updated += 1;
        }

        Ok(updated)
    }

    async fn mark_email_sent(&self, id: &Uuid) -> Result<(), NotificationError> {
        self.update(id, |n| !std::mem::replace(&mut n.email_sent, true))
            .await
            .map(|_| ())
    }

    async fn mark_push_sent(&self, id: &Uuid) -> Result<(), NotificationError> {
        self.update(id, |n| !std::mem::replace(&mut n.push_sent, true))
            .await
            .map(|_| ())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), NotificationError> {
        let mut records = self.records.write().await;
        let index = records
            .iter()
            .position(|n| n.id == *id)
            .ok_or(NotificationError::NotFound)?;
        records.remove(index);
        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, NotificationError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|n| !ids.contains(&n.id));
        Ok((before - records.len()) as u64)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, NotificationError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|n| n.user_id != user_id);
        Ok((before - records.len()) as u64)
    }

    async fn list_by_type(
        &self,
        user_id: &str,
        notification_type: NotificationType,
    ) -> Result<Vec<Notification>, NotificationError> {
        let records = self.records.read().await;
        Ok(Self::newest_first(records.iter().filter(|n| {
            n.user_id == user_id && n.notification_type == notification_type
        })))
    }

    async fn find_older_than(
        &self,
        cutoff: DateTime<Utc>,
        only_read: bool,
    ) -> Result<Vec<Notification>, NotificationError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|n| n.created_at < cutoff && (!only_read || n.is_read))
            .cloned()
            .collect())
    }

    async fn find_unsent_email(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>, NotificationError> {
        let records = self.records.read().await;
        let mut unsent: Vec<Notification> = records
            .iter()
            .filter(|n| n.wants_email && !n.email_sent)
            .filter(|n| n.created_at >= since && n.created_at < until)
            .cloned()
            .collect();
        unsent.sort_by_key(|n| n.created_at);
        unsent.truncate(limit as usize);
        Ok(unsent)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<NotificationStats, NotificationError> {
        let records = self.records.read().await;
        let day_ago = now - Duration::hours(24);

        let mut stats = NotificationStats {
            total: records.len() as u64,
            by_type: NotificationType::ALL.into_iter().map(|t| (t, 0)).collect(),
            ..Default::default()
        };

        for record in records.iter() {
            if !record.is_read {
                stats.unread += 1;
            }
            if record.created_at >= day_ago {
                stats.last_24_hours += 1;
            }
            *stats.by_type.entry(record.notification_type).or_insert(0) += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(user_id: &str, notification_type: NotificationType) -> NewNotification {
        NewNotification::new(user_id, "Title", "Message", notification_type)
    }

    fn aged(user_id: &str, days: i64, is_read: bool) -> Notification {
        let mut n = new_record(user_id, NotificationType::General)
            .into_notification(Utc::now() - Duration::days(days));
        n.is_read = is_read;
        n
    }

    #[tokio::test]
    async fn test_create_then_list_includes_defaults() {
        let store = InMemoryNotificationStore::new();
        let created = store
            .create(new_record("user1", NotificationType::RequestSent))
            .await
            .unwrap();

        let page = store.list_for_user("user1", 1, 20).await.unwrap();
        assert_eq!(page.total, 1);
        let listed = &page.items[0];
        assert_eq!(listed.id, created.id);
        assert!(!listed.is_read);
        assert!(!listed.email_sent);
        assert!(!listed.push_sent);
        assert_eq!(listed.created_at, listed.updated_at);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields() {
        let store = InMemoryNotificationStore::new();
        let err = store
            .create(new_record("", NotificationType::General))
            .await
            .unwrap_err();

        assert!(matches!(err, NotificationError::Validation(ref m) if m.contains("userId")));
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let store = InMemoryNotificationStore::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(
                store
                    .create(new_record("user1", NotificationType::General))
                    .await
                    .unwrap()
                    .id,
            );
        }
        store
            .create(new_record("user2", NotificationType::General))
            .await
            .unwrap();

        let first = store.list_for_user("user1", 1, 2).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.pages(), 3);
        assert_eq!(first.items.iter().map(|n| n.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);

        let last = store.list_for_user("user1", 3, 2).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, ids[0]);

        let beyond = store.list_for_user("user1", 9, 2).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[tokio::test]
    async fn test_zero_page_is_rejected() {
        let store = InMemoryNotificationStore::new();
        assert!(matches!(
            store.list_for_user("user1", 0, 20).await,
            Err(NotificationError::Validation(_))
        ));
        assert!(matches!(
            store.list_for_user("user1", 1, 0).await,
            Err(NotificationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = InMemoryNotificationStore::new();
        let created = store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();

        let first = store.mark_read(&created.id).await.unwrap();
        let second = store.mark_read(&created.id).await.unwrap();

        assert!(first.is_read);
        assert!(second.is_read);
        assert_eq!(first.updated_at, second.updated_at);
        assert_eq!(store.unread_count("user1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_only_touches_one_user() {
        let store = InMemoryNotificationStore::new();
        for _ in 0..3 {
            store
                .create(new_record("user1", NotificationType::General))
                .await
                .unwrap();
        }
        store
            .create(new_record("user2", NotificationType::General))
            .await
            .unwrap();

        assert_eq!(store.mark_all_read("user1").await.unwrap(), 3);
        assert_eq!(store.unread_count("user1").await.unwrap(), 0);
        assert_eq!(store.unread_count("user2").await.unwrap(), 1);
        assert_eq!(store.mark_all_read("user1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleted_notification_is_gone() {
        let store = InMemoryNotificationStore::new();
        let created = store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();

        store.delete(&created.id).await.unwrap();

        assert_eq!(store.list_for_user("user1", 1, 20).await.unwrap().total, 0);
        assert!(matches!(
            store.mark_read(&created.id).await,
            Err(NotificationError::NotFound)
        ));
        assert!(matches!(
            store.delete(&created.id).await,
            Err(NotificationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let store = InMemoryNotificationStore::new();
        store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();
        store
            .create(new_record("user1", NotificationType::BookReturned))
            .await
            .unwrap();
        store
            .create(new_record("user2", NotificationType::General))
            .await
            .unwrap();

        assert_eq!(store.delete_all_for_user("user1").await.unwrap(), 2);
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_type() {
        let store = InMemoryNotificationStore::new();
        store
            .create(new_record("user1", NotificationType::BookReturned))
            .await
            .unwrap();
        store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();
        store
            .create(new_record("user2", NotificationType::BookReturned))
            .await
            .unwrap();

        let returned = store
            .list_by_type("user1", NotificationType::BookReturned)
            .await
            .unwrap();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].user_id, "user1");
    }

    #[tokio::test]
    async fn test_find_older_than_respects_read_filter() {
        let store = InMemoryNotificationStore::new();
        let old_read = aged("user1", 31, true);
        let old_unread = aged("user1", 31, false);
        let recent_read = aged("user1", 10, true);
        store
            .restore(vec![old_read.clone(), old_unread.clone(), recent_read])
            .await;

        let cutoff = Utc::now() - Duration::days(30);
        let read_only = store.find_older_than(cutoff, true).await.unwrap();
        assert_eq!(read_only.len(), 1);
        assert_eq!(read_only[0].id, old_read.id);

        let any = store.find_older_than(cutoff, false).await.unwrap();
        assert_eq!(any.len(), 2);
    }

    #[tokio::test]
    async fn test_find_unsent_email_window_and_limit() {
        let store = InMemoryNotificationStore::new();
        let stale = aged("user1", 8, false);
        let older = aged("user1", 3, false);
        let newer = aged("user1", 1, false);
        let mut sent = aged("user1", 1, false);
        sent.email_sent = true;
        let mut push_only = aged("user1", 2, false);
        push_only.wants_email = false;
        let fresh = aged("user1", 0, false);
        store
            .restore(vec![newer.clone(), stale, sent, push_only, fresh, older.clone()])
            .await;

        let since = Utc::now() - Duration::days(7);
        let until = Utc::now() - Duration::hours(1);
        let unsent = store.find_unsent_email(since, until, 10).await.unwrap();
        assert_eq!(
            unsent.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![older.id, newer.id]
        );

        let capped = store.find_unsent_email(since, until, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, older.id);
    }

    #[tokio::test]
    async fn test_push_only_records_keep_opt_out() {
        let store = InMemoryNotificationStore::new();
        let created = store
            .create(new_record("user1", NotificationType::General).without_email())
            .await
            .unwrap();
        assert!(!created.wants_email);
        assert!(!store.get(&created.id).await.unwrap().wants_email);

        let unsent = store
            .find_unsent_email(Utc::now() - Duration::days(1), Utc::now() + Duration::hours(1), 10)
            .await
            .unwrap();
        assert!(unsent.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_flags_are_independent() {
        let store = InMemoryNotificationStore::new();
        let created = store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();

        store.mark_push_sent(&created.id).await.unwrap();
        let stored = store.get(&created.id).await.unwrap();
        assert!(stored.push_sent);
        assert!(!stored.email_sent);

        store.mark_email_sent(&created.id).await.unwrap();
        assert!(store.get(&created.id).await.unwrap().email_sent);
        assert!(matches!(
            store.mark_email_sent(&Uuid::new_v4()).await,
            Err(NotificationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_many_skips_unknown_ids() {
        let store = InMemoryNotificationStore::new();
        let a = store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();
        store
            .create(new_record("user1", NotificationType::General))
            .await
            .unwrap();

        let removed = store.delete_many(&[a.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = InMemoryNotificationStore::new();
        store
            .restore(vec![aged("user1", 2, true), aged("user2", 0, false)])
            .await;
        store
            .create(new_record("user1", NotificationType::BookReturned))
            .await
            .unwrap();

        let stats = store.stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unread, 2);
        assert_eq!(stats.last_24_hours, 2);
        assert_eq!(stats.by_type[&NotificationType::General], 2);
        assert_eq!(stats.by_type[&NotificationType::BookReturned], 1);
        assert_eq!(stats.by_type[&NotificationType::DueDateReminder], 0);
    }
}
