// service/acceptance.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::marketdb::MarketExt,
    models::{marketmodel::*, notificationmodel::*},
    service::{
        error::ServiceError,
        notification_service::{emit_events, NotificationDispatcher},
    },
};

/// Resolves a job's bidding: one bid accepted, its pending siblings
/// rejected, the job assigned and a booking created, as a single unit.
#[derive(Debug, Clone)]
pub struct AcceptanceCoordinator {
    store: Arc<dyn MarketExt>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl AcceptanceCoordinator {
    pub fn new(store: Arc<dyn MarketExt>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn accept_bid(
        &self,
        bid_id: Uuid,
        customer_id: Uuid,
    ) -> Result<AcceptanceRecord, ServiceError> {
        let bid = self
            .store
            .get_bid_by_id(bid_id)
            .await?
            .ok_or(ServiceError::BidNotFound(bid_id))?;
        let job = self
            .store
            .get_job_by_id(bid.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(bid.job_id))?;

        if job.customer_id != customer_id {
            return Err(ServiceError::forbidden(customer_id, format!("accept bid {}", bid_id)));
        }
        if job.status != JobStatus::Open || bid.status != BidStatus::Pending {
            return Err(ServiceError::JobNotOpen(job.id));
        }

        // Checks above are advisory; the store repeats them under the job
        // lock and a losing racer gets JobNotOpen from there.
        let record = self.store.commit_acceptance(bid_id).await?;

        tracing::info!(
            "Bid {} accepted for job {}: booking {} at {}, {} sibling bids rejected",
            record.accepted_bid.id,
            record.job.id,
            record.booking.id,
            record.booking.agreed_amount,
            record.rejected_bids.len()
        );

        emit_events(self.dispatcher.as_ref(), acceptance_events(&record)).await;

        Ok(record)
    }
}

fn acceptance_events(record: &AcceptanceRecord) -> Vec<LifecycleEvent> {
    let job = &record.job;
    let mut events = Vec::with_capacity(record.rejected_bids.len() + 2);

    events.push(LifecycleEvent::new(
        EventType::BidAccepted,
        job.id,
        Some(record.accepted_bid.id),
        record.accepted_bid.worker_id,
        serde_json::json!({
            "job_title": job.title,
            "booking_id": record.booking.id,
            "agreed_amount": record.booking.agreed_amount,
        }),
    ));

    for bid in &record.rejected_bids {
        events.push(LifecycleEvent::new(
            EventType::BidRejected,
            job.id,
            Some(bid.id),
            bid.worker_id,
            serde_json::json!({ "job_title": job.title, "amount": bid.amount }),
        ));
    }

    events.push(LifecycleEvent::new(
        EventType::JobAssigned,
        job.id,
        Some(record.accepted_bid.id),
        job.customer_id,
        serde_json::json!({
            "job_title": job.title,
            "booking_id": record.booking.id,
            "worker_id": record.accepted_bid.worker_id,
        }),
    ));

    events
}
