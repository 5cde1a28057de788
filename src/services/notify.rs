use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::entities::notification::{self, NotificationKind};

/// Persists in-app notifications without blocking the caller.
///
/// Every write runs on its own task; a failure is logged and dropped so it can
/// never undo or fail the operation that triggered it.
#[derive(Clone)]
pub struct Notifier {
    db: DatabaseConnection,
}

impl Notifier {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: &str,
    ) {
        let record = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            kind: Set(kind),
            title: Set(title.into()),
            message: Set(message.into()),
            link: Set(link.to_string()),
            is_read: Set(false),
            ..Default::default()
        };
        let db = self.db.clone();

        tokio::spawn(async move {
            if let Err(e) = record.insert(&db).await {
                tracing::warn!(%user_id, ?kind, error = %e, "Failed to store notification");
            }
        });
    }
}
