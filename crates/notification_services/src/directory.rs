use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::email::UserDirectory;
use crate::types::EmailError;

/// Looks up active users in the platform's `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Creates a directory backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn resolve_email(&self, user_id: &str) -> Result<Option<String>, EmailError> {
        let row = sqlx::query("SELECT email FROM users WHERE id::text = $1 AND is_active = true")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<String>, _>("email")?),
            None => Ok(None),
        }
    }
}

/// Fixed user → address map, for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    emails: HashMap<String, String>,
}

impl StaticUserDirectory {
    /// Builds a directory from `(user_id, email)` pairs.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            emails: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parses `user=email` pairs separated by commas, skipping malformed entries.
    pub fn from_pairs(raw: &str) -> Self {
        Self::new(raw.split(',').filter_map(|pair| {
            let (user_id, email) = pair.split_once('=')?;
            let (user_id, email) = (user_id.trim(), email.trim());
            (!user_id.is_empty() && !email.is_empty()).then_some((user_id, email))
        }))
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn resolve_email(&self, user_id: &str) -> Result<Option<String>, EmailError> {
        Ok(self.emails.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_from_pairs() {
        let directory = StaticUserDirectory::from_pairs("u1=a@x.test, u2 = b@x.test,broken,=c@x.test");

        assert_eq!(directory.resolve_email("u1").await.unwrap().as_deref(), Some("a@x.test"));
        assert_eq!(directory.resolve_email("u2").await.unwrap().as_deref(), Some("b@x.test"));
        assert_eq!(directory.resolve_email("broken").await.unwrap(), None);
        assert_eq!(directory.resolve_email("").await.unwrap(), None);
    }
}
