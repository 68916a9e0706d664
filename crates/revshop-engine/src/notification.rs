//! # Notification Sink
//!
//! Fire-and-forget messages to buyers and sellers. Callers log a failed
//! send and carry on; nothing here is ever retried.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use revshop_core::NotificationKind;
use revshop_db::{Database, DbError};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification store failed: {0}")]
    Store(#[from] DbError),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, user_id: i64, message: &str, kind: NotificationKind) -> Result<(), NotificationError>;
}

/// Default sink: writes into the `notifications` table for in-app display.
#[derive(Debug, Clone)]
pub struct StoredNotificationSink {
    db: Database,
}

impl StoredNotificationSink {
    pub fn new(db: Database) -> Self {
        StoredNotificationSink { db }
    }
}

#[async_trait]
impl NotificationSink for StoredNotificationSink {
    async fn send(&self, user_id: i64, message: &str, kind: NotificationKind) -> Result<(), NotificationError> {
        let stored = self.db.notifications().create(user_id, kind, message).await?;
        debug!(notification_id = stored.id, user_id, ?kind, "Notification stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revshop_core::NewUser;
    use revshop_db::DbConfig;

    #[tokio::test]
    async fn test_stored_sink_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let buyer = db
            .users()
            .create_buyer(&NewUser::new("n@example.com", "N", "B"))
            .await
            .unwrap();

        let sink = StoredNotificationSink::new(db.clone());
        sink.send(buyer.id, "Order #1 placed successfully!", NotificationKind::Order)
            .await
            .unwrap();

        let unread = db.notifications().unread_for_user(buyer.id).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, NotificationKind::Order);
        assert_eq!(unread[0].message, "Order #1 placed successfully!");
    }

    #[tokio::test]
    async fn test_unknown_user_fails() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sink = StoredNotificationSink::new(db);

        let err = sink
            .send(404, "hello", NotificationKind::General)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Store(DbError::ForeignKeyViolation { .. })));
    }
}
