// service/bid_ledger.rs
use std::sync::Arc;

use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::marketdb::MarketExt,
    models::{marketmodel::*, notificationmodel::*},
    service::{
        error::ServiceError,
        notification_service::{emit_events, NotificationDispatcher},
    },
};

pub const DEFAULT_MIN_PROPOSAL_LENGTH: usize = 20;

/// Tracks bids against jobs. Bids are never deleted; `rejected` and
/// `withdrawn` are terminal but kept for history.
#[derive(Debug, Clone)]
pub struct BidLedger {
    store: Arc<dyn MarketExt>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    min_proposal_length: usize,
}

impl BidLedger {
    pub fn new(
        store: Arc<dyn MarketExt>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        min_proposal_length: usize,
    ) -> Self {
        Self {
            store,
            dispatcher,
            min_proposal_length,
        }
    }

    pub async fn submit_bid(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        amount: BigDecimal,
        proposal: String,
    ) -> Result<Bid, ServiceError> {
        let amount = to_cents(&amount);
        if amount <= BigDecimal::from(0) {
            return Err(ServiceError::Validation(
                "Bid amount must be at least 0.01".to_string(),
            ));
        }
        if !is_storable_amount(&amount) {
            return Err(ServiceError::Validation("Bid amount is too large".to_string()));
        }

        let proposal = proposal.trim().to_string();
        if proposal.chars().count() < self.min_proposal_length {
            return Err(ServiceError::Validation(format!(
                "Proposal must be at least {} characters",
                self.min_proposal_length
            )));
        }

        let job = self
            .store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.status != JobStatus::Open {
            return Err(ServiceError::JobNotOpen(job_id));
        }

        // The store re-checks both the job status and the duplicate slot.
        let bid = self
            .store
            .create_bid(NewBid {
                job_id,
                worker_id,
                amount,
                proposal,
            })
            .await?;

        if !bid.is_within_budget(&job) {
            tracing::debug!(
                "Bid {} of {} is outside the budget of job {} ({} - {})",
                bid.id,
                bid.amount,
                job.id,
                job.budget_min,
                job.budget_max
            );
        }
        tracing::info!("Bid {} placed on job {} by {}", bid.id, job_id, worker_id);

        Ok(bid)
    }

    pub async fn withdraw_bid(&self, bid_id: Uuid, worker_id: Uuid) -> Result<Bid, ServiceError> {
        let bid = self.get_bid(bid_id).await?;

        if bid.worker_id != worker_id {
            return Err(ServiceError::forbidden(worker_id, format!("withdraw bid {}", bid_id)));
        }
        if bid.status != BidStatus::Pending {
            return Err(ServiceError::InvalidBidState(bid_id, bid.status));
        }

        let bid = self
            .store
            .update_pending_bid_status(bid_id, BidStatus::Withdrawn)
            .await?;

        tracing::info!("Bid {} withdrawn from job {}", bid.id, bid.job_id);

        Ok(bid)
    }

    /// Customer declines a single bid while keeping the job open.
    pub async fn reject_bid(&self, bid_id: Uuid, customer_id: Uuid) -> Result<Bid, ServiceError> {
        let bid = self.get_bid(bid_id).await?;
        let job = self
            .store
            .get_job_by_id(bid.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(bid.job_id))?;

        if job.customer_id != customer_id {
            return Err(ServiceError::forbidden(customer_id, format!("reject bid {}", bid_id)));
        }
        if bid.status != BidStatus::Pending {
            return Err(ServiceError::InvalidBidState(bid_id, bid.status));
        }

        let bid = self
            .store
            .update_pending_bid_status(bid_id, BidStatus::Rejected)
            .await?;

        tracing::info!("Bid {} on job {} rejected", bid.id, job.id);

        let event = LifecycleEvent::new(
            EventType::BidRejected,
            job.id,
            Some(bid.id),
            bid.worker_id,
            serde_json::json!({ "job_title": job.title, "amount": bid.amount }),
        );
        emit_events(self.dispatcher.as_ref(), vec![event]).await;

        Ok(bid)
    }

    pub async fn get_bid(&self, bid_id: Uuid) -> Result<Bid, ServiceError> {
        self.store
            .get_bid_by_id(bid_id)
            .await?
            .ok_or(ServiceError::BidNotFound(bid_id))
    }

    /// The job owner sees every bid; anyone else only their own.
    pub async fn list_for_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        let job = self
            .store
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let bids = self.store.get_job_bids(job_id).await?;
        if job.customer_id == actor_id {
            return Ok(bids);
        }

        Ok(bids.into_iter().filter(|b| b.worker_id == actor_id).collect())
    }

    pub async fn list_for_worker(&self, worker_id: Uuid) -> Result<Vec<Bid>, ServiceError> {
        self.store.get_worker_bids(worker_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;

    const PROPOSAL: &str = "Licensed plumber, can come this evening";

    #[tokio::test]
    async fn submit_validates_amount_and_proposal() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;
        let worker = Uuid::new_v4();

        let err = market
            .bids
            .submit_bid(job.id, worker, money(0), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = market
            .bids
            .submit_bid(job.id, worker, money(-50), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = market
            .bids
            .submit_bid(job.id, worker, money(6000), "   too short        ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        assert!(market.bids.list_for_worker(worker).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn amounts_are_kept_to_the_cent_and_bounded() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;

        let err = market
            .bids
            .submit_bid(job.id, Uuid::new_v4(), "0.001".parse().unwrap(), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = market
            .bids
            .submit_bid(job.id, Uuid::new_v4(), money(1_000_000_000_000), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let bid = market
            .bids
            .submit_bid(job.id, Uuid::new_v4(), "6000.456".parse().unwrap(), PROPOSAL.to_string())
            .await
            .unwrap();
        assert_eq!(bid.amount, "6000.46".parse::<BigDecimal>().unwrap());
    }

    #[tokio::test]
    async fn amounts_outside_budget_are_advisory() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;

        let bid = market
            .bids
            .submit_bid(job.id, Uuid::new_v4(), money(12000), PROPOSAL.to_string())
            .await
            .unwrap();
        assert_eq!(bid.status, BidStatus::Pending);
        assert!(!bid.is_within_budget(&job));
    }

    #[tokio::test]
    async fn one_active_bid_per_worker_and_job() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;
        let worker = Uuid::new_v4();
        market.bid(job.id, worker, 6000).await;

        let err = market
            .bids
            .submit_bid(job.id, worker, money(5500), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateBid { .. }));
    }

    #[tokio::test]
    async fn withdrawing_frees_the_slot() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;
        let worker = Uuid::new_v4();
        let first = market.bid(job.id, worker, 6000).await;

        let withdrawn = market.bids.withdraw_bid(first.id, worker).await.unwrap();
        assert_eq!(withdrawn.status, BidStatus::Withdrawn);

        let second = market
            .bids
            .submit_bid(job.id, worker, money(5800), PROPOSAL.to_string())
            .await
            .unwrap();
        assert_eq!(second.status, BidStatus::Pending);
        assert_ne!(second.id, first.id);

        let history = market.bids.list_for_worker(worker).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn withdraw_is_only_for_pending_bids_of_the_worker() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;
        let worker = Uuid::new_v4();
        let bid = market.bid(job.id, worker, 6000).await;

        let err = market.bids.withdraw_bid(bid.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        market.bids.withdraw_bid(bid.id, worker).await.unwrap();
        let err = market.bids.withdraw_bid(bid.id, worker).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBidState(_, BidStatus::Withdrawn)));
    }

    #[tokio::test]
    async fn withdrawal_leaves_other_bids_alone() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;
        let w1 = Uuid::new_v4();
        let b1 = market.bid(job.id, w1, 6000).await;
        let b2 = market.bid(job.id, Uuid::new_v4(), 7000).await;

        market.bids.withdraw_bid(b1.id, w1).await.unwrap();

        let b2 = market.bids.get_bid(b2.id).await.unwrap();
        assert_eq!(b2.status, BidStatus::Pending);
    }

    #[tokio::test]
    async fn rejected_bids_cannot_be_resubmitted() {
        let market = Market::new();
        let customer = Uuid::new_v4();
        let job = market.post_job(customer, "Lahore").await;
        let worker = Uuid::new_v4();
        let bid = market.bid(job.id, worker, 6000).await;

        let rejected = market.bids.reject_bid(bid.id, customer).await.unwrap();
        assert_eq!(rejected.status, BidStatus::Rejected);

        let err = market
            .bids
            .submit_bid(job.id, worker, money(5000), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateBid { .. }));

        let feed = market.notifications.list_notifications(worker, 10, 0).await.unwrap();
        assert_eq!(feed[0].event_type, EventType::BidRejected);
    }

    #[tokio::test]
    async fn reject_requires_ownership_and_pending_state() {
        let market = Market::new();
        let customer = Uuid::new_v4();
        let job = market.post_job(customer, "Lahore").await;
        let worker = Uuid::new_v4();
        let bid = market.bid(job.id, worker, 6000).await;

        let err = market.bids.reject_bid(bid.id, worker).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        market.bids.withdraw_bid(bid.id, worker).await.unwrap();
        let err = market.bids.reject_bid(bid.id, customer).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBidState(_, BidStatus::Withdrawn)));

        let err = market.bids.reject_bid(Uuid::new_v4(), customer).await.unwrap_err();
        assert!(matches!(err, ServiceError::BidNotFound(_)));
    }

    #[tokio::test]
    async fn bids_on_unknown_job_are_not_found() {
        let market = Market::new();
        let err = market
            .bids
            .submit_bid(Uuid::new_v4(), Uuid::new_v4(), money(100), PROPOSAL.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn job_listing_is_scoped_to_the_actor() {
        let market = Market::new();
        let customer = Uuid::new_v4();
        let job = market.post_job(customer, "Lahore").await;
        let w1 = Uuid::new_v4();
        market.bid(job.id, w1, 6000).await;
        market.bid(job.id, Uuid::new_v4(), 7000).await;

        assert_eq!(market.bids.list_for_job(job.id, customer).await.unwrap().len(), 2);

        let own = market.bids.list_for_job(job.id, w1).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].worker_id, w1);
    }
}
