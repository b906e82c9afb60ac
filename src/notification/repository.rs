//! Handle database requests for notifications.

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::Result;
use crate::notification::Notification;

const NOTIFICATION_COLUMNS: &str = "id, user_id, task_id, message, noti_type, read, created_at";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: Pool<Postgres>,
}

impl NotificationRepository {
    /// Create a new [`NotificationRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`Notification`] into database.
    pub async fn insert(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO notifications (id, user_id, task_id, message, noti_type, read)
                VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.task_id)
        .bind(&notification.message)
        .bind(notification.noti_type)
        .bind(notification.read)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persisted unread notices for one user, newest first.
    pub async fn unread(&self, owner: Uuid) -> Result<Vec<Notification>> {
        let query = format!(
            r#"SELECT {NOTIFICATION_COLUMNS} FROM notifications
                WHERE user_id = $1 AND NOT read
                ORDER BY created_at DESC"#
        );

        Ok(sqlx::query_as::<_, Notification>(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Flip every unread notice owned by the user to read.
    pub async fn mark_all_read(&self, owner: Uuid) -> Result<u64> {
        let result =
            sqlx::query(r#"UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read"#)
                .bind(owner)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Flip one notice to read. A missing match is a no-op, not an error.
    pub async fn mark_read(&self, owner: Uuid, id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE notifications SET read = TRUE
                WHERE id = $1 AND user_id = $2 AND NOT read"#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
