// db/memorydb.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{marketdb::MarketExt, notificationdb::NotificationExt};
use crate::{
    models::{marketmodel::*, notificationmodel::*},
    service::error::ServiceError,
};

#[derive(Debug, Default)]
struct Tables {
    jobs: HashMap<Uuid, Job>,
    bids: HashMap<Uuid, Bid>,
    bookings: HashMap<Uuid, Booking>,
    profiles: HashMap<Uuid, WorkerProfile>,
    messages: Vec<BookingMessage>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn job(&self, job_id: Uuid) -> Result<&Job, ServiceError> {
        self.jobs.get(&job_id).ok_or(ServiceError::JobNotFound(job_id))
    }

    fn set_job_status(&mut self, job_id: Uuid, status: JobStatus) -> Result<Job, ServiceError> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(ServiceError::JobNotFound(job_id))?;
        job.status = status;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    fn booking_for_job_mut(&mut self, job_id: Uuid) -> Result<&mut Booking, ServiceError> {
        self.bookings
            .values_mut()
            .find(|b| b.job_id == job_id)
            .ok_or(ServiceError::Database(sqlx::Error::RowNotFound))
    }

    /// Rejects every pending bid on the job except `keep`.
    fn reject_pending_bids(&mut self, job_id: Uuid, keep: Option<Uuid>) -> Vec<Bid> {
        let now = Utc::now();
        let mut rejected: Vec<Bid> = self
            .bids
            .values_mut()
            .filter(|b| b.job_id == job_id && b.status == BidStatus::Pending && Some(b.id) != keep)
            .map(|b| {
                b.status = BidStatus::Rejected;
                b.updated_at = now;
                b.clone()
            })
            .collect();
        rejected.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        rejected
    }
}

/// In-process store with the same unit-of-work semantics as the Postgres
/// implementation: every trait method runs under one write lock, which
/// plays the role of the job row lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profiles are owned by the external profile service; this is how
    /// that service's writes arrive in a process-local deployment.
    pub async fn put_worker_profile(
        &self,
        worker_id: Uuid,
        city: impl Into<String>,
        province: impl Into<String>,
        services: Vec<ServiceCategory>,
    ) -> WorkerProfile {
        let profile = WorkerProfile {
            worker_id,
            city: city.into(),
            province: province.into(),
            services,
            updated_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .profiles
            .insert(worker_id, profile.clone());
        profile
    }

    pub async fn all_bookings(&self) -> Vec<Booking> {
        self.tables.read().await.bookings.values().cloned().collect()
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl MarketExt for MemoryStore {
    async fn create_job(&self, customer_id: Uuid, job: NewJob) -> Result<Job, ServiceError> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            customer_id,
            category: job.category,
            title: job.title,
            description: job.description,
            budget_min: job.budget_min,
            budget_max: job.budget_max,
            location_city: job.location_city,
            location_province: job.location_province,
            location_address: job.location_address,
            status: JobStatus::Open,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, ServiceError> {
        Ok(self.tables.read().await.jobs.get(&job_id).cloned())
    }

    async fn get_open_jobs_in_city(&self, city: &str) -> Result<Vec<Job>, ServiceError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Open && j.location_city == city)
            .cloned()
            .collect();
        newest_first(&mut jobs, |j| (j.created_at, std::cmp::Reverse(j.id)));
        Ok(jobs)
    }

    async fn get_customer_jobs(&self, customer_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.customer_id == customer_id)
            .cloned()
            .collect();
        newest_first(&mut jobs, |j| (j.created_at, std::cmp::Reverse(j.id)));
        Ok(jobs)
    }

    async fn get_worker_profile(
        &self,
        worker_id: Uuid,
    ) -> Result<Option<WorkerProfile>, ServiceError> {
        Ok(self.tables.read().await.profiles.get(&worker_id).cloned())
    }

    async fn create_bid(&self, bid: NewBid) -> Result<Bid, ServiceError> {
        let mut tables = self.tables.write().await;

        if tables.job(bid.job_id)?.status != JobStatus::Open {
            return Err(ServiceError::JobNotOpen(bid.job_id));
        }

        let duplicate = tables.bids.values().any(|b| {
            b.job_id == bid.job_id && b.worker_id == bid.worker_id && b.status.holds_slot()
        });
        if duplicate {
            return Err(ServiceError::DuplicateBid {
                job_id: bid.job_id,
                worker_id: bid.worker_id,
            });
        }

        let now = Utc::now();
        let created = Bid {
            id: Uuid::new_v4(),
            job_id: bid.job_id,
            worker_id: bid.worker_id,
            amount: bid.amount,
            proposal: bid.proposal,
            status: BidStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.bids.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_bid_by_id(&self, bid_id: Uuid) -> Result<Option<Bid>, ServiceError> {
        Ok(self.tables.read().await.bids.get(&bid_id).cloned())
    }

    async fn get_job_bids(&self, job_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        let tables = self.tables.read().await;
        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.job_id == job_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(bids)
    }

    async fn get_worker_bids(&self, worker_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        let tables = self.tables.read().await;
        let mut bids: Vec<Bid> = tables
            .bids
            .values()
            .filter(|b| b.worker_id == worker_id)
            .cloned()
            .collect();
        newest_first(&mut bids, |b| (b.created_at, std::cmp::Reverse(b.id)));
        Ok(bids)
    }

    async fn update_pending_bid_status(
        &self,
        bid_id: Uuid,
        status: BidStatus,
    ) -> Result<Bid, ServiceError> {
        let mut tables = self.tables.write().await;
        let bid = tables
            .bids
            .get_mut(&bid_id)
            .ok_or(ServiceError::BidNotFound(bid_id))?;

        if bid.status != BidStatus::Pending {
            return Err(ServiceError::InvalidBidState(bid_id, bid.status));
        }

        bid.status = status;
        bid.updated_at = Utc::now();
        Ok(bid.clone())
    }

    async fn commit_acceptance(&self, bid_id: Uuid) -> Result<AcceptanceRecord, ServiceError> {
        let mut tables = self.tables.write().await;

        let bid = tables
            .bids
            .get(&bid_id)
            .cloned()
            .ok_or(ServiceError::BidNotFound(bid_id))?;
        let job = tables.job(bid.job_id)?.clone();

        // Every check happens before the first write, so a failure leaves
        // the tables untouched.
        if job.status != JobStatus::Open || bid.status != BidStatus::Pending {
            return Err(ServiceError::JobNotOpen(job.id));
        }
        if tables.bookings.values().any(|b| b.job_id == job.id) {
            return Err(ServiceError::JobNotOpen(job.id));
        }

        let now = Utc::now();
        let accepted_bid = {
            let target = tables
                .bids
                .get_mut(&bid_id)
                .ok_or(ServiceError::BidNotFound(bid_id))?;
            target.status = BidStatus::Accepted;
            target.updated_at = now;
            target.clone()
        };
        let rejected_bids = tables.reject_pending_bids(job.id, Some(bid_id));
        let job = tables.set_job_status(job.id, JobStatus::Assigned)?;

        let booking = Booking {
            id: Uuid::new_v4(),
            job_id: job.id,
            bid_id,
            worker_id: accepted_bid.worker_id,
            customer_id: job.customer_id,
            agreed_amount: accepted_bid.amount.clone(),
            status: BookingStatus::Confirmed,
            customer_confirmed_at: None,
            worker_confirmed_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.insert(booking.id, booking.clone());

        Ok(AcceptanceRecord {
            job,
            accepted_bid,
            rejected_bids,
            booking,
        })
    }

    async fn cancel_open_job(&self, job_id: Uuid) -> Result<CancellationRecord, ServiceError> {
        let mut tables = self.tables.write().await;

        let current = tables.job(job_id)?.status;
        if !current.can_transition_to(JobStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                job_id,
                from: current,
                to: JobStatus::Cancelled,
            });
        }

        let rejected_bids = tables.reject_pending_bids(job_id, None);
        let job = tables.set_job_status(job_id, JobStatus::Cancelled)?;

        Ok(CancellationRecord { job, rejected_bids })
    }

    async fn advance_job_status(&self, job_id: Uuid, to: JobStatus) -> Result<Job, ServiceError> {
        let mut tables = self.tables.write().await;

        let current = tables.job(job_id)?.status;
        let allowed = matches!(to, JobStatus::InProgress | JobStatus::Disputed)
            && current.can_transition_to(to);
        if !allowed {
            return Err(ServiceError::InvalidTransition {
                job_id,
                from: current,
                to,
            });
        }

        if to == JobStatus::InProgress {
            let booking = tables.booking_for_job_mut(job_id)?;
            booking.status = BookingStatus::InProgress;
            booking.updated_at = Utc::now();
        }

        tables.set_job_status(job_id, to)
    }

    async fn confirm_completion(
        &self,
        job_id: Uuid,
        party: Party,
    ) -> Result<CompletionRecord, ServiceError> {
        let mut tables = self.tables.write().await;

        let current = tables.job(job_id)?.status;
        if !current.can_transition_to(JobStatus::Completed) {
            return Err(ServiceError::InvalidTransition {
                job_id,
                from: current,
                to: JobStatus::Completed,
            });
        }

        let now = Utc::now();
        let booking = {
            let booking = tables.booking_for_job_mut(job_id)?;
            let slot = match party {
                Party::Customer => &mut booking.customer_confirmed_at,
                Party::Worker => &mut booking.worker_confirmed_at,
            };
            slot.get_or_insert(now);
            if booking.is_confirmed_by_both() {
                booking.status = BookingStatus::Completed;
            }
            booking.updated_at = now;
            booking.clone()
        };

        let completed = booking.is_confirmed_by_both();
        let job = if completed {
            tables.set_job_status(job_id, JobStatus::Completed)?
        } else {
            tables.job(job_id)?.clone()
        };

        Ok(CompletionRecord {
            job,
            booking,
            completed,
        })
    }

    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, ServiceError> {
        Ok(self.tables.read().await.bookings.get(&booking_id).cloned())
    }

    async fn get_booking_for_job(&self, job_id: Uuid) -> Result<Option<Booking>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.values().find(|b| b.job_id == job_id).cloned())
    }

    async fn get_user_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, ServiceError> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.worker_id == user_id || b.customer_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| (b.created_at, std::cmp::Reverse(b.id)));
        Ok(bookings)
    }

    async fn create_message(
        &self,
        booking_id: Uuid,
        sender_id: Uuid,
        body: String,
    ) -> Result<BookingMessage, ServiceError> {
        let message = BookingMessage {
            id: Uuid::new_v4(),
            booking_id,
            sender_id,
            body,
            created_at: Utc::now(),
        };
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn get_booking_messages(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<BookingMessage>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationExt for MemoryStore {
    async fn store_notification(
        &self,
        event: &LifecycleEvent,
        message: String,
    ) -> Result<Notification, ServiceError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: event.recipient_id,
            event_type: event.event_type,
            job_id: event.job_id,
            bid_id: event.bid_id,
            payload: event.payload.clone(),
            message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError> {
        let tables = self.tables.read().await;
        // Pushed in creation order, so reversing gives newest first.
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == user_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, ServiceError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == user_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }
}
