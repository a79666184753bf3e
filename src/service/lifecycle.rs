// service/lifecycle.rs
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

/// Owns the job state machine. Apart from the acceptance unit of work,
/// every job status change goes through `transition_job`.
#[derive(Debug, Clone)]
pub struct JobLifecycleManager {
    store: Arc<dyn MarketExt>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl JobLifecycleManager {
    pub fn new(store: Arc<dyn MarketExt>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn create_job(&self, customer_id: Uuid, mut job: NewJob) -> Result<Job, ServiceError> {
        job.budget_min = to_cents(&job.budget_min);
        job.budget_max = to_cents(&job.budget_max);
        validate_new_job(&job)?;

        let job = self.store.create_job(customer_id, job).await?;

        tracing::info!(
            "Job {} posted by {} ({} in {})",
            job.id,
            customer_id,
            job.category.to_str(),
            job.location_city
        );

        Ok(job)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn list_customer_jobs(&self, customer_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        self.store.get_customer_jobs(customer_id).await
    }

    pub async fn transition_job(
        &self,
        job_id: Uuid,
        actor_id: Uuid,
        target: JobStatus,
    ) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;
        let booking = if job.status.has_booking() {
            self.store.get_booking_for_job(job_id).await?
        } else {
            None
        };

        let party = resolve_party(&job, booking.as_ref(), actor_id)
            .ok_or_else(|| ServiceError::forbidden(actor_id, format!("change job {}", job_id)))?;

        match target {
            JobStatus::Cancelled => self.cancel(job, actor_id, party).await,
            JobStatus::InProgress | JobStatus::Disputed => {
                self.advance(job, booking, party, target).await
            }
            JobStatus::Completed => self.confirm_completion(job, booking, party).await,
            // Open has no incoming edge and Assigned belongs to acceptance.
            JobStatus::Open | JobStatus::Assigned => Err(ServiceError::InvalidTransition {
                job_id,
                from: job.status,
                to: target,
            }),
        }
    }

    async fn cancel(&self, job: Job, actor_id: Uuid, party: Party) -> Result<Job, ServiceError> {
        if party != Party::Customer {
            return Err(ServiceError::forbidden(actor_id, format!("cancel job {}", job.id)));
        }
        if !job.status.can_transition_to(JobStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                to: JobStatus::Cancelled,
            });
        }

        let record = self.store.cancel_open_job(job.id).await?;

        tracing::info!(
            "Job {} cancelled, {} pending bids rejected",
            record.job.id,
            record.rejected_bids.len()
        );

        let events = record
            .rejected_bids
            .iter()
            .map(|bid| {
                LifecycleEvent::new(
                    EventType::JobCancelled,
                    record.job.id,
                    Some(bid.id),
                    bid.worker_id,
                    serde_json::json!({ "job_title": record.job.title }),
                )
            })
            .collect();
        emit_events(self.dispatcher.as_ref(), events).await;

        Ok(record.job)
    }

    async fn advance(
        &self,
        job: Job,
        booking: Option<Booking>,
        party: Party,
        target: JobStatus,
    ) -> Result<Job, ServiceError> {
        if !job.status.can_transition_to(target) {
            return Err(ServiceError::InvalidTransition {
                job_id: job.id,
                from: job.status,
                to: target,
            });
        }

        let updated = self.store.advance_job_status(job.id, target).await?;

        tracing::info!("Job {} moved {} -> {}", job.id, job.status, updated.status);

        if let Some(booking) = booking {
            let event_type = if target == JobStatus::Disputed {
                EventType::JobDisputed
            } else {
                EventType::JobStarted
            };
            let event = LifecycleEvent::new(
                event_type,
                updated.id,
                Some(booking.bid_id),
                booking.counterpart(party),
                serde_json::json!({
                    "job_title": updated.title,
                    "booking_id": booking.id,
                    "raised_by": party,
                }),
            );
            emit_events(self.dispatcher.as_ref(), vec![event]).await;
        }

        Ok(updated)
    }

    /// Records one party's confirmation. The job completes only when both
    /// sides have confirmed; until then it stays in progress.
    async fn confirm_completion(
        &self,
        job: Job,
        booking: Option<Booking>,
        party: Party,
    ) -> Result<Job, ServiceError> {
        let booking = match booking {
            Some(booking) if job.status.can_transition_to(JobStatus::Completed) => booking,
            _ => {
                return Err(ServiceError::InvalidTransition {
                    job_id: job.id,
                    from: job.status,
                    to: JobStatus::Completed,
                })
            }
        };

        let record = self.store.confirm_completion(job.id, party).await?;

        let payload = serde_json::json!({
            "job_title": record.job.title,
            "booking_id": record.booking.id,
        });
        let events = if record.completed {
            tracing::info!("Job {} completed by mutual confirmation", record.job.id);
            vec![
                LifecycleEvent::new(
                    EventType::JobCompleted,
                    record.job.id,
                    Some(booking.bid_id),
                    booking.customer_id,
                    payload.clone(),
                ),
                LifecycleEvent::new(
                    EventType::JobCompleted,
                    record.job.id,
                    Some(booking.bid_id),
                    booking.worker_id,
                    payload,
                ),
            ]
        } else {
            tracing::info!(
                "Job {} completion confirmed by {:?}, waiting on the other party",
                record.job.id,
                party
            );
            vec![LifecycleEvent::new(
                EventType::CompletionConfirmed,
                record.job.id,
                Some(booking.bid_id),
                booking.counterpart(party),
                payload,
            )]
        };
        emit_events(self.dispatcher.as_ref(), events).await;

        Ok(record.job)
    }
}

/// The actor's side of the job: its owner, or the worker named on its
/// booking. Anyone else has no capability over it.
pub fn resolve_party(job: &Job, booking: Option<&Booking>, actor_id: Uuid) -> Option<Party> {
    if actor_id == job.customer_id {
        return Some(Party::Customer);
    }
    booking
        .filter(|b| b.job_id == job.id)
        .and_then(|b| b.party_of(actor_id))
}

fn validate_new_job(job: &NewJob) -> Result<(), ServiceError> {
    let zero = sqlx::types::BigDecimal::from(0);
    if job.budget_min < zero || job.budget_max < zero {
        return Err(ServiceError::Validation(
            "Budget cannot be negative".to_string(),
        ));
    }
    if job.budget_min > job.budget_max {
        return Err(ServiceError::Validation(
            "Minimum budget cannot exceed maximum budget".to_string(),
        ));
    }
    if !is_storable_amount(&job.budget_max) {
        return Err(ServiceError::Validation("Budget is too large".to_string()));
    }

    let bounded = [
        ("Title", &job.title),
        ("City", &job.location_city),
        ("Province", &job.location_province),
    ];
    for (field, value) in bounded {
        if value.chars().count() > MAX_SHORT_TEXT_LENGTH {
            return Err(ServiceError::Validation(format!(
                "{} must be at most {} characters",
                field, MAX_SHORT_TEXT_LENGTH
            )));
        }
    }

    let required = [
        ("Title", &job.title),
        ("City", &job.location_city),
        ("Province", &job.location_province),
        ("Address", &job.location_address),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ServiceError::Validation(format!("{} is required", field)));
        }
    }

    Ok(())
}
