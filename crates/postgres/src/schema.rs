use sqlx::PgPool;

/// Statements run in order by [`ensure_schema`]. Each one is idempotent.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id UUID PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        type TEXT NOT NULL CHECK (type IN (
            'request_sent', 'request_approved', 'request_rejected',
            'book_returned', 'due_date_reminder', 'general'
        )),
        data JSONB NOT NULL DEFAULT '{}'::jsonb,
        is_read BOOLEAN NOT NULL DEFAULT false,
        wants_email BOOLEAN NOT NULL DEFAULT true,
        email_sent BOOLEAN NOT NULL DEFAULT false,
        push_sent BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    ALTER TABLE notifications
        ADD COLUMN IF NOT EXISTS wants_email BOOLEAN NOT NULL DEFAULT true
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_notifications_user_read_created
        ON notifications (user_id, is_read, created_at DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_notifications_user_type
        ON notifications (user_id, type)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_notifications_pending_email
        ON notifications (created_at)
        WHERE wants_email AND NOT email_sent
    "#,
];

/// Creates the `notifications` table and its indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    log::info!("🗃️ Notification schema is up to date");
    Ok(())
}
