// service/background_jobs.rs
use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::service::notification_service::NotificationService;

/// Re-attempts notification deliveries that failed on the request path.
pub async fn start_notification_retry_job(
    notification_service: Arc<NotificationService>,
    every_secs: u64,
) {
    let mut interval = interval(Duration::from_secs(every_secs.max(1)));

    loop {
        interval.tick().await;

        let pending = notification_service.pending_retries().await;
        if pending == 0 {
            continue;
        }

        let delivered = notification_service.retry_failed().await;
        tracing::info!(
            "Notification retry job delivered {} of {} queued events",
            delivered,
            pending
        );
    }
}
