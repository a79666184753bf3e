// db/marketdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::{is_unique_violation, DBClient};
use crate::{models::marketmodel::*, service::error::ServiceError};

/// Storage for jobs, bids, bookings and booking messages.
///
/// Every method is one unit of work. The methods that change job or bid
/// status re-check their precondition inside that unit of work, so the
/// services' own checks are only a fast path.
#[async_trait]
pub trait MarketExt: Send + Sync + std::fmt::Debug {
    // Jobs
    async fn create_job(&self, customer_id: Uuid, job: NewJob) -> Result<Job, ServiceError>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, ServiceError>;

    async fn get_open_jobs_in_city(&self, city: &str) -> Result<Vec<Job>, ServiceError>;

    async fn get_customer_jobs(&self, customer_id: Uuid) -> Result<Vec<Job>, ServiceError>;

    // Worker profiles are written by the profile service; read-only here.
    async fn get_worker_profile(
        &self,
        worker_id: Uuid,
    ) -> Result<Option<WorkerProfile>, ServiceError>;

    // Bids
    /// Inserts a pending bid. Fails with `JobNotOpen` unless the job is
    /// open and `DuplicateBid` if the worker already holds a slot on it.
    async fn create_bid(&self, bid: NewBid) -> Result<Bid, ServiceError>;

    async fn get_bid_by_id(&self, bid_id: Uuid) -> Result<Option<Bid>, ServiceError>;

    async fn get_job_bids(&self, job_id: Uuid) -> Result<Vec<Bid>, ServiceError>;

    async fn get_worker_bids(&self, worker_id: Uuid) -> Result<Vec<Bid>, ServiceError>;

    /// Compare-and-set from `pending` to `status`.
    async fn update_pending_bid_status(
        &self,
        bid_id: Uuid,
        status: BidStatus,
    ) -> Result<Bid, ServiceError>;

    // Lifecycle units of work
    /// Accepts the bid, rejects its pending siblings, assigns the job and
    /// creates the booking. All or nothing.
    async fn commit_acceptance(&self, bid_id: Uuid) -> Result<AcceptanceRecord, ServiceError>;

    async fn cancel_open_job(&self, job_id: Uuid) -> Result<CancellationRecord, ServiceError>;

    /// Moves a booked job to `InProgress` or `Disputed`.
    async fn advance_job_status(&self, job_id: Uuid, to: JobStatus) -> Result<Job, ServiceError>;

    async fn confirm_completion(
        &self,
        job_id: Uuid,
        party: Party,
    ) -> Result<CompletionRecord, ServiceError>;

    // Bookings
    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, ServiceError>;

    async fn get_booking_for_job(&self, job_id: Uuid) -> Result<Option<Booking>, ServiceError>;

    async fn get_user_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, ServiceError>;

    // Messaging
    async fn create_message(
        &self,
        booking_id: Uuid,
        sender_id: Uuid,
        body: String,
    ) -> Result<BookingMessage, ServiceError>;

    async fn get_booking_messages(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<BookingMessage>, ServiceError>;
}

#[async_trait]
impl MarketExt for DBClient {
    async fn create_job(&self, customer_id: Uuid, job: NewJob) -> Result<Job, ServiceError> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
            (id, customer_id, category, title, description, budget_min, budget_max,
             location_city, location_province, location_address, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'open'::job_status)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(job.category)
        .bind(job.title)
        .bind(job.description)
        .bind(job.budget_min)
        .bind(job.budget_max)
        .bind(job.location_city)
        .bind(job.location_province)
        .bind(job.location_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, ServiceError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    async fn get_open_jobs_in_city(&self, city: &str) -> Result<Vec<Job>, ServiceError> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'open'::job_status AND location_city = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn get_customer_jobs(&self, customer_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE customer_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn get_worker_profile(
        &self,
        worker_id: Uuid,
    ) -> Result<Option<WorkerProfile>, ServiceError> {
        let profile = sqlx::query_as::<_, WorkerProfile>(
            r#"
            SELECT worker_id, city, province, services, updated_at
            FROM worker_profiles
            WHERE worker_id = $1
            "#,
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn create_bid(&self, bid: NewBid) -> Result<Bid, ServiceError> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE blocks behind an acceptance or cancellation holding the job.
        let status = sqlx::query_scalar::<_, JobStatus>(
            "SELECT status FROM jobs WHERE id = $1 FOR SHARE",
        )
        .bind(bid.job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::JobNotFound(bid.job_id))?;

        if status != JobStatus::Open {
            return Err(ServiceError::JobNotOpen(bid.job_id));
        }

        let existing = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM bids
            WHERE job_id = $1 AND worker_id = $2 AND status <> 'withdrawn'::bid_status
            LIMIT 1
            "#,
        )
        .bind(bid.job_id)
        .bind(bid.worker_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(ServiceError::DuplicateBid {
                job_id: bid.job_id,
                worker_id: bid.worker_id,
            });
        }

        // The partial unique index catches a concurrent submit by the same worker.
        let created = sqlx::query_as::<_, Bid>(
            r#"
            INSERT INTO bids (id, job_id, worker_id, amount, proposal, status)
            VALUES ($1, $2, $3, $4, $5, 'pending'::bid_status)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bid.job_id)
        .bind(bid.worker_id)
        .bind(&bid.amount)
        .bind(&bid.proposal)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::DuplicateBid {
                    job_id: bid.job_id,
                    worker_id: bid.worker_id,
                }
            } else {
                ServiceError::Database(e)
            }
        })?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_bid_by_id(&self, bid_id: Uuid) -> Result<Option<Bid>, ServiceError> {
        let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1")
            .bind(bid_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bid)
    }

    async fn get_job_bids(&self, job_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        let bids = sqlx::query_as::<_, Bid>(
            "SELECT * FROM bids WHERE job_id = $1 ORDER BY created_at ASC, id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }

    async fn get_worker_bids(&self, worker_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        let bids = sqlx::query_as::<_, Bid>(
            "SELECT * FROM bids WHERE worker_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }

    async fn update_pending_bid_status(
        &self,
        bid_id: Uuid,
        status: BidStatus,
    ) -> Result<Bid, ServiceError> {
        let updated = sqlx::query_as::<_, Bid>(
            r#"
            UPDATE bids
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'::bid_status
            RETURNING *
            "#,
        )
        .bind(bid_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(bid) => Ok(bid),
            None => match self.get_bid_by_id(bid_id).await? {
                Some(current) => Err(ServiceError::InvalidBidState(bid_id, current.status)),
                None => Err(ServiceError::BidNotFound(bid_id)),
            },
        }
    }

    async fn commit_acceptance(&self, bid_id: Uuid) -> Result<AcceptanceRecord, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let job_id = sqlx::query_scalar::<_, Uuid>("SELECT job_id FROM bids WHERE id = $1")
            .bind(bid_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::BidNotFound(bid_id))?;

        // Lock order is job first, then bids. The job row lock is the
        // linearization point for concurrent acceptances.
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.status != JobStatus::Open {
            return Err(ServiceError::JobNotOpen(job_id));
        }

        let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1 FOR UPDATE")
            .bind(bid_id)
            .fetch_one(&mut *tx)
            .await?;

        if bid.status != BidStatus::Pending {
            return Err(ServiceError::JobNotOpen(job_id));
        }

        let accepted_bid = sqlx::query_as::<_, Bid>(
            r#"
            UPDATE bids SET status = 'accepted'::bid_status, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(bid_id)
        .fetch_one(&mut *tx)
        .await?;

        let rejected_bids = sqlx::query_as::<_, Bid>(
            r#"
            UPDATE bids SET status = 'rejected'::bid_status, updated_at = NOW()
            WHERE job_id = $1 AND id <> $2 AND status = 'pending'::bid_status
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(bid_id)
        .fetch_all(&mut *tx)
        .await?;

        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET status = 'assigned'::job_status, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
            (id, job_id, bid_id, worker_id, customer_id, agreed_amount, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'confirmed'::booking_status)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(bid_id)
        .bind(accepted_bid.worker_id)
        .bind(job.customer_id)
        .bind(&accepted_bid.amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AcceptanceRecord {
            job,
            accepted_bid,
            rejected_bids,
            booking,
        })
    }

    async fn cancel_open_job(&self, job_id: Uuid) -> Result<CancellationRecord, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, JobStatus>(
            "SELECT status FROM jobs WHERE id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::JobNotFound(job_id))?;

        if !current.can_transition_to(JobStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                job_id,
                from: current,
                to: JobStatus::Cancelled,
            });
        }

        let rejected_bids = sqlx::query_as::<_, Bid>(
            r#"
            UPDATE bids SET status = 'rejected'::bid_status, updated_at = NOW()
            WHERE job_id = $1 AND status = 'pending'::bid_status
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_all(&mut *tx)
        .await?;

        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET status = 'cancelled'::job_status, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CancellationRecord { job, rejected_bids })
    }

    async fn advance_job_status(&self, job_id: Uuid, to: JobStatus) -> Result<Job, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, JobStatus>(
            "SELECT status FROM jobs WHERE id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::JobNotFound(job_id))?;

        let allowed = matches!(to, JobStatus::InProgress | JobStatus::Disputed)
            && current.can_transition_to(to);
        if !allowed {
            return Err(ServiceError::InvalidTransition {
                job_id,
                from: current,
                to,
            });
        }

        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(job_id)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        if to == JobStatus::InProgress {
            sqlx::query(
                r#"
                UPDATE bookings SET status = 'in_progress'::booking_status, updated_at = NOW()
                WHERE job_id = $1
                "#,
            )
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(job)
    }

    async fn confirm_completion(
        &self,
        job_id: Uuid,
        party: Party,
    ) -> Result<CompletionRecord, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, JobStatus>(
            "SELECT status FROM jobs WHERE id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::JobNotFound(job_id))?;

        if !current.can_transition_to(JobStatus::Completed) {
            return Err(ServiceError::InvalidTransition {
                job_id,
                from: current,
                to: JobStatus::Completed,
            });
        }

        let confirm_sql = match party {
            Party::Customer => {
                r#"
                UPDATE bookings
                SET customer_confirmed_at = COALESCE(customer_confirmed_at, NOW()), updated_at = NOW()
                WHERE job_id = $1
                RETURNING *
                "#
            }
            Party::Worker => {
                r#"
                UPDATE bookings
                SET worker_confirmed_at = COALESCE(worker_confirmed_at, NOW()), updated_at = NOW()
                WHERE job_id = $1
                RETURNING *
                "#
            }
        };

        let mut booking = sqlx::query_as::<_, Booking>(confirm_sql)
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?;

        let completed = booking.is_confirmed_by_both();
        let job = if completed {
            booking = sqlx::query_as::<_, Booking>(
                r#"
                UPDATE bookings SET status = 'completed'::booking_status, updated_at = NOW()
                WHERE job_id = $1
                RETURNING *
                "#,
            )
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query_as::<_, Job>(
                r#"
                UPDATE jobs SET status = 'completed'::job_status, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;

        Ok(CompletionRecord {
            job,
            booking,
            completed,
        })
    }

    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, ServiceError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn get_booking_for_job(&self, job_id: Uuid) -> Result<Option<Booking>, ServiceError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn get_user_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, ServiceError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE worker_id = $1 OR customer_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn create_message(
        &self,
        booking_id: Uuid,
        sender_id: Uuid,
        body: String,
    ) -> Result<BookingMessage, ServiceError> {
        let message = sqlx::query_as::<_, BookingMessage>(
            r#"
            INSERT INTO booking_messages (id, booking_id, sender_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn get_booking_messages(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<BookingMessage>, ServiceError> {
        let messages = sqlx::query_as::<_, BookingMessage>(
            r#"
            SELECT * FROM booking_messages
            WHERE booking_id = $1
            ORDER BY created_at ASC, id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
