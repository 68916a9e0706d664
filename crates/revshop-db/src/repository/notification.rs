//! # Notification Repository
//!
//! In-app notifications. Rows are only ever marked read, never deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use revshop_core::{Notification, NotificationKind};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, message, is_read, created_at";

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
    ) -> DbResult<Notification> {
        debug!(user_id, ?kind, "Creating notification");

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, message, is_read, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
        let created = sqlx::query_as::<_, Notification>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// All of a user's notifications, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> DbResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn unread_for_user(&self, user_id: i64) -> DbResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?1 AND is_read = 0 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn mark_read(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }
        Ok(())
    }

    /// Returns how many were flipped.
    pub async fn mark_all_read(&self, user_id: i64) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use revshop_core::NewUser;

    #[tokio::test]
    async fn test_notification_read_flow() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create_buyer(&NewUser::new("n@example.com", "N", "One"))
            .await
            .unwrap()
            .id;
        let notes = db.notifications();

        let first = notes
            .create(user, NotificationKind::Order, "Order #1 placed successfully!")
            .await
            .unwrap();
        notes
            .create(user, NotificationKind::OrderUpdate, "Order #1 status updated to SHIPPED by seller")
            .await
            .unwrap();

        let all = notes.list_for_user(user).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, NotificationKind::OrderUpdate);
        assert_eq!(notes.unread_count(user).await.unwrap(), 2);

        notes.mark_read(first.id).await.unwrap();
        assert_eq!(notes.unread_for_user(user).await.unwrap().len(), 1);

        assert_eq!(notes.mark_all_read(user).await.unwrap(), 1);
        assert_eq!(notes.unread_count(user).await.unwrap(), 0);

        assert!(notes.mark_read(999).await.unwrap_err().is_not_found());
    }
}
