// service/catalog.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::marketdb::MarketExt,
    models::marketmodel::*,
    service::error::ServiceError,
};

/// Computes which open jobs a worker may see. Recomputed on every call from
/// the current profile; nothing is cached.
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    store: Arc<dyn MarketExt>,
}

impl CatalogFilter {
    pub fn new(store: Arc<dyn MarketExt>) -> Self {
        Self { store }
    }

    pub async fn list_eligible_jobs(&self, worker_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        let profile = match self.store.get_worker_profile(worker_id).await? {
            Some(profile) => profile,
            None => {
                tracing::debug!("No profile for worker {}, no eligible jobs", worker_id);
                return Ok(Vec::new());
            }
        };

        // The store narrows by city; eligibility itself is decided here.
        let jobs = self
            .store
            .get_open_jobs_in_city(&profile.city)
            .await?
            .into_iter()
            .filter(|job| job.status == JobStatus::Open && is_eligible(&profile, job))
            .collect();

        Ok(jobs)
    }
}

/// Strict city match plus a category the worker offers. No radius logic.
pub fn is_eligible(profile: &WorkerProfile, job: &Job) -> bool {
    profile.city == job.location_city && profile.services.contains(&job.category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;

    #[tokio::test]
    async fn workers_see_jobs_in_their_city_and_trade() {
        let market = Market::new();
        let job = market.post_job(Uuid::new_v4(), "Lahore").await;

        let w1 = Uuid::new_v4();
        market
            .store
            .put_worker_profile(w1, "Lahore", "Punjab", vec![ServiceCategory::Plumbing])
            .await;
        let w2 = Uuid::new_v4();
        market
            .store
            .put_worker_profile(w2, "Karachi", "Sindh", vec![ServiceCategory::Plumbing])
            .await;

        let seen = market.catalog.list_eligible_jobs(w1).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, job.id);

        assert!(market.catalog.list_eligible_jobs(w2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn category_must_match() {
        let market = Market::new();
        market.post_job(Uuid::new_v4(), "Lahore").await;

        let electrician = Uuid::new_v4();
        market
            .store
            .put_worker_profile(
                electrician,
                "Lahore",
                "Punjab",
                vec![ServiceCategory::Electrical, ServiceCategory::Painting],
            )
            .await;

        assert!(market.catalog.list_eligible_jobs(electrician).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_jobs_drop_out_of_the_listing() {
        let market = Market::new();
        let customer = Uuid::new_v4();
        let open = market.post_job(customer, "Lahore").await;
        let cancelled = market.post_job(customer, "Lahore").await;
        market
            .lifecycle
            .transition_job(cancelled.id, customer, JobStatus::Cancelled)
            .await
            .unwrap();
        assert!(market.store.all_bookings().await.is_empty());

        let worker = Uuid::new_v4();
        market
            .store
            .put_worker_profile(worker, "Lahore", "Punjab", vec![ServiceCategory::Plumbing])
            .await;

        let seen = market.catalog.list_eligible_jobs(worker).await.unwrap();
        assert_eq!(seen.iter().map(|j| j.id).collect::<Vec<_>>(), vec![open.id]);
    }

    #[tokio::test]
    async fn profile_changes_apply_on_the_next_call() {
        let market = Market::new();
        market.post_job(Uuid::new_v4(), "Lahore").await;
        let worker = Uuid::new_v4();

        assert!(market.catalog.list_eligible_jobs(worker).await.unwrap().is_empty());

        market
            .store
            .put_worker_profile(worker, "Lahore", "Punjab", vec![ServiceCategory::Plumbing])
            .await;
        assert_eq!(market.catalog.list_eligible_jobs(worker).await.unwrap().len(), 1);

        market
            .store
            .put_worker_profile(worker, "Multan", "Punjab", vec![ServiceCategory::Plumbing])
            .await;
        assert!(market.catalog.list_eligible_jobs(worker).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_is_stable_for_a_fixed_snapshot() {
        let market = Market::new();
        let customer = Uuid::new_v4();
        for _ in 0..5 {
            market.post_job(customer, "Lahore").await;
        }
        let worker = Uuid::new_v4();
        market
            .store
            .put_worker_profile(worker, "Lahore", "Punjab", vec![ServiceCategory::Plumbing])
            .await;

        let first = market.catalog.list_eligible_jobs(worker).await.unwrap();
        let second = market.catalog.list_eligible_jobs(worker).await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }
}
