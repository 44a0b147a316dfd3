use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::store::{NotificationStore, check_page};
use crate::types::*;

const COLUMNS: &str = r#"
    id, user_id, title, message, type, data, is_read,
    wants_email, email_sent, push_sent, created_at, updated_at
"#;

/// PostgreSQL-backed notification store.
///
/// Expects the `notifications` table created by `postgres::schema::ensure_schema`.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Creates a new instance of `PgNotificationStore` with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> Result<Notification, NotificationError> {
        let raw_type: String = row.try_get("type")?;
        let notification_type = raw_type
            .parse::<NotificationType>()
            .map_err(|e| NotificationError::Database(sqlx::Error::Decode(Box::new(e))))?;

        let data = match row.try_get::<serde_json::Value, _>("data")? {
            serde_json::Value::Object(map) => map,
            _ => NotificationData::new(),
        };

        Ok(Notification {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            notification_type,
            data,
            is_read: row.try_get("is_read")?,
            wants_email: row.try_get("wants_email")?,
            email_sent: row.try_get("email_sent")?,
            push_sent: row.try_get("push_sent")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn from_rows(rows: &[PgRow]) -> Result<Vec<Notification>, NotificationError> {
        rows.iter().map(Self::from_row).collect()
    }

    async fn set_flag(&self, column: &str, id: &Uuid) -> Result<(), NotificationError> {
        let sql = format!(
            "UPDATE notifications SET {col} = true, updated_at = NOW() WHERE id = $1 AND NOT {col}",
            col = column
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            // Either unknown or already set; only the former is an error.
            self.get(id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, record: NewNotification) -> Result<Notification, NotificationError> {
        let notification = record.normalized()?.into_notification(Utc::now());

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO notifications (
                id, user_id, title, message, type, data, is_read,
                wants_email, email_sent, push_sent, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(notification.id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type.as_str())
        .bind(serde_json::Value::Object(notification.data.clone()))
        .bind(notification.is_read)
        .bind(notification.wants_email)
        .bind(notification.email_sent)
        .bind(notification.push_sent)
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Self::from_row(&row)
    }

    async fn get(&self, id: &Uuid) -> Result<Notification, NotificationError> {
        let row = sqlx::query(&format!("SELECT {} FROM notifications WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::from_row(&row),
            None => Err(NotificationError::NotFound),
        }
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<NotificationPage, NotificationError> {
        check_page(page, page_size)?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let offset = i64::from(page - 1) * i64::from(page_size);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(NotificationPage {
            items: Self::from_rows(&rows)?,
            total: total as u64,
            page,
            page_size,
        })
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64, NotificationError> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS unread FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .try_get("unread")?;

        Ok(count as u64)
    }

    async fn mark_read(&self, id: &Uuid) -> Result<Notification, NotificationError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notifications
            SET is_read = true,
                updated_at = CASE WHEN is_read THEN updated_at ELSE NOW() END
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::from_row(&row),
            None => Err(NotificationError::NotFound),
        }
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true, updated_at = NOW() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_email_sent(&self, id: &Uuid) -> Result<(), NotificationError> {
        self.set_flag("email_sent", id).await
    }

    async fn mark_push_sent(&self, id: &Uuid) -> Result<(), NotificationError> {
        self.set_flag("push_sent", id).await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), NotificationError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound);
        }

        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, NotificationError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM notifications WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, NotificationError> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_by_type(
        &self,
        user_id: &str,
        notification_type: NotificationType,
    ) -> Result<Vec<Notification>, NotificationError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1 AND type = $2
            ORDER BY created_at DESC
            "#,
            COLUMNS
        ))
        .bind(user_id)
        .bind(notification_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Self::from_rows(&rows)
    }

    async fn find_older_than(
        &self,
        cutoff: DateTime<Utc>,
        only_read: bool,
    ) -> Result<Vec<Notification>, NotificationError> {
        let filter = if only_read { "AND is_read" } else { "" };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE created_at < $1 {}",
            COLUMNS, filter
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Self::from_rows(&rows)
    }

    async fn find_unsent_email(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>, NotificationError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE wants_email AND NOT email_sent
              AND created_at >= $1 AND created_at < $2
            ORDER BY created_at ASC
            LIMIT $3
            "#,
            COLUMNS
        ))
        .bind(since)
        .bind(until)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Self::from_rows(&rows)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<NotificationStats, NotificationError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE NOT is_read) AS unread,
                COUNT(*) FILTER (WHERE created_at >= $1) AS recent
            FROM notifications
            "#,
        )
        .bind(now - Duration::hours(24))
        .fetch_one(&self.pool)
        .await?;

        let mut stats = NotificationStats {
            total: totals.try_get::<i64, _>("total")? as u64,
            unread: totals.try_get::<i64, _>("unread")? as u64,
            last_24_hours: totals.try_get::<i64, _>("recent")? as u64,
            by_type: NotificationType::ALL.into_iter().map(|t| (t, 0)).collect(),
        };

        let rows = sqlx::query("SELECT type, COUNT(*) AS count FROM notifications GROUP BY type")
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let raw_type: String = row.try_get("type")?;
            match raw_type.parse::<NotificationType>() {
                Ok(t) => {
                    stats.by_type.insert(t, row.try_get::<i64, _>("count")? as u64);
                }
                Err(_) => log::warn!("Skipping unknown notification type in stats: {}", raw_type),
            }
        }

        Ok(stats)
    }
}
