// db/notificationdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::{
    models::notificationmodel::{LifecycleEvent, Notification},
    service::error::ServiceError,
};

#[async_trait]
pub trait NotificationExt: Send + Sync + std::fmt::Debug {
    async fn store_notification(
        &self,
        event: &LifecycleEvent,
        message: String,
    ) -> Result<Notification, ServiceError>;

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError>;

    /// Returns `None` when the notification does not exist or belongs to
    /// another user.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, ServiceError>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn store_notification(
        &self,
        event: &LifecycleEvent,
        message: String,
    ) -> Result<Notification, ServiceError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications
            (id, recipient_id, event_type, job_id, bid_id, payload, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.recipient_id)
        .bind(event.event_type)
        .bind(event.job_id)
        .bind(event.bid_id)
        .bind(&event.payload)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, ServiceError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }
}
