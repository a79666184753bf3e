// service/notification_service.rs
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::notificationdb::NotificationExt,
    models::notificationmodel::*,
    service::error::ServiceError,
};

/// Receives lifecycle events once the state change behind them has
/// committed. Delivery is outside the consistency boundary: callers log a
/// failure and move on.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync + std::fmt::Debug {
    async fn dispatch(&self, event: LifecycleEvent) -> Result<(), ServiceError>;
}

/// Fans events out concurrently. Never fails; each failed delivery is
/// logged and left to the dispatcher's own retry.
pub async fn emit_events(dispatcher: &dyn NotificationDispatcher, events: Vec<LifecycleEvent>) {
    let results = futures::future::join_all(events.into_iter().map(|event| {
        let summary = (event.event_type, event.job_id, event.recipient_id);
        async move { (summary, dispatcher.dispatch(event).await) }
    }))
    .await;

    for ((event_type, job_id, recipient_id), result) in results {
        if let Err(e) = result {
            tracing::warn!(
                "Failed to deliver {} for job {} to {}: {}",
                event_type.to_str(),
                job_id,
                recipient_id,
                e
            );
        }
    }
}

#[derive(Debug, Clone)]
struct PendingDelivery {
    event: LifecycleEvent,
    attempts: u32,
}

/// Persists events as user-facing notifications and serves the pull feed.
#[derive(Debug)]
pub struct NotificationService {
    store: Arc<dyn NotificationExt>,
    retry_queue: Mutex<VecDeque<PendingDelivery>>,
    max_attempts: u32,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationExt>, max_attempts: u32) -> Self {
        Self {
            store,
            retry_queue: Mutex::new(VecDeque::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    async fn deliver(&self, event: &LifecycleEvent) -> Result<Notification, ServiceError> {
        let notification = self
            .store
            .store_notification(event, describe(event))
            .await?;

        tracing::info!(
            "Notification {}: {} for job {} to {}",
            notification.id,
            event.event_type.to_str(),
            event.job_id,
            event.recipient_id
        );

        Ok(notification)
    }

    /// Re-attempts queued deliveries once. Returns how many succeeded.
    pub async fn retry_failed(&self) -> usize {
        let pending: Vec<PendingDelivery> = self.retry_queue.lock().await.drain(..).collect();
        let mut delivered = 0;

        for mut item in pending {
            item.attempts += 1;
            match self.deliver(&item.event).await {
                Ok(_) => delivered += 1,
                Err(e) if item.attempts < self.max_attempts => {
                    tracing::warn!(
                        "Retry {} of {} for job {} failed: {}",
                        item.attempts,
                        item.event.event_type.to_str(),
                        item.event.job_id,
                        e
                    );
                    self.retry_queue.lock().await.push_back(item);
                }
                Err(e) => {
                    tracing::error!(
                        "Dropping {} for job {} to {} after {} attempts: {}",
                        item.event.event_type.to_str(),
                        item.event.job_id,
                        item.event.recipient_id,
                        item.attempts,
                        e
                    );
                }
            }
        }

        delivered
    }

    pub async fn pending_retries(&self) -> usize {
        self.retry_queue.lock().await.len()
    }

    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError> {
        self.store
            .get_user_notifications(user_id, limit.clamp(1, 100), offset.max(0))
            .await
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification, ServiceError> {
        self.store
            .mark_notification_read(notification_id, user_id)
            .await?
            .ok_or(ServiceError::NotificationNotFound(notification_id))
    }
}

#[async_trait]
impl NotificationDispatcher for NotificationService {
    async fn dispatch(&self, event: LifecycleEvent) -> Result<(), ServiceError> {
        match self.deliver(&event).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.retry_queue.lock().await.push_back(PendingDelivery {
                    event,
                    attempts: 1,
                });
                Err(ServiceError::Notification(e.to_string()))
            }
        }
    }
}

fn describe(event: &LifecycleEvent) -> String {
    let title = event
        .payload
        .get("job_title")
        .and_then(|t| t.as_str())
        .unwrap_or("your job");

    match event.event_type {
        EventType::BidAccepted => format!("Your bid on \"{}\" was accepted", title),
        EventType::BidRejected => format!("Your bid on \"{}\" was not selected", title),
        EventType::JobAssigned => format!("\"{}\" has been assigned to a worker", title),
        EventType::JobCancelled => format!("\"{}\" was cancelled by the customer", title),
        EventType::JobStarted => format!("Work on \"{}\" has started", title),
        EventType::CompletionConfirmed => {
            format!("The other party marked \"{}\" as complete", title)
        }
        EventType::JobCompleted => format!("\"{}\" is complete", title),
        EventType::JobDisputed => format!("A dispute was raised on \"{}\"", title),
    }
}
