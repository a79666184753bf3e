// Shared fixtures for the service tests.
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::memorydb::MemoryStore,
    models::{marketmodel::*, notificationmodel::*},
    service::{
        acceptance::AcceptanceCoordinator,
        bid_ledger::{BidLedger, DEFAULT_MIN_PROPOSAL_LENGTH},
        booking_gate::BookingGate,
        catalog::CatalogFilter,
        error::ServiceError,
        lifecycle::JobLifecycleManager,
        notification_service::{NotificationDispatcher, NotificationService},
    },
};

pub fn money(amount: i64) -> BigDecimal {
    BigDecimal::from(amount)
}

pub fn plumbing_job_in(city: &str) -> NewJob {
    NewJob {
        category: ServiceCategory::Plumbing,
        title: "Fix kitchen sink".to_string(),
        description: "Leaking trap under the kitchen sink, needs replacing".to_string(),
        budget_min: money(5000),
        budget_max: money(8000),
        location_city: city.to_string(),
        location_province: "Punjab".to_string(),
        location_address: "12 Mall Road".to_string(),
    }
}

#[derive(Debug)]
pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _event: LifecycleEvent) -> Result<(), ServiceError> {
        Err(ServiceError::Notification("dispatcher offline".to_string()))
    }
}

pub struct Market {
    pub store: Arc<MemoryStore>,
    pub notifications: Arc<NotificationService>,
    pub lifecycle: JobLifecycleManager,
    pub bids: BidLedger,
    pub catalog: CatalogFilter,
    pub acceptance: AcceptanceCoordinator,
    pub gate: BookingGate,
}

impl Market {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifications = Arc::new(NotificationService::new(store.clone(), 3));
        Self::build(store, notifications.clone(), notifications)
    }

    pub fn with_dispatcher(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifications = Arc::new(NotificationService::new(store.clone(), 3));
        Self::build(store, notifications, dispatcher)
    }

    fn build(
        store: Arc<MemoryStore>,
        notifications: Arc<NotificationService>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            lifecycle: JobLifecycleManager::new(store.clone(), dispatcher.clone()),
            bids: BidLedger::new(store.clone(), dispatcher.clone(), DEFAULT_MIN_PROPOSAL_LENGTH),
            catalog: CatalogFilter::new(store.clone()),
            acceptance: AcceptanceCoordinator::new(store.clone(), dispatcher),
            gate: BookingGate::new(store.clone()),
            store,
            notifications,
        }
    }

    pub async fn post_job(&self, customer_id: Uuid, city: &str) -> Job {
        self.lifecycle
            .create_job(customer_id, plumbing_job_in(city))
            .await
            .unwrap()
    }

    pub async fn bid(&self, job_id: Uuid, worker_id: Uuid, amount: i64) -> Bid {
        self.bids
            .submit_bid(
                job_id,
                worker_id,
                money(amount),
                "Experienced, can start this week with my own tools".to_string(),
            )
            .await
            .unwrap()
    }

    /// An assigned job with `worker_id` holding the booking.
    pub async fn booked_job(&self, customer_id: Uuid, worker_id: Uuid) -> (Job, Booking) {
        let job = self.post_job(customer_id, "Lahore").await;
        let bid = self.bid(job.id, worker_id, 6000).await;
        let record = self.acceptance.accept_bid(bid.id, customer_id).await.unwrap();
        (record.job, record.booking)
    }

    pub async fn feed(&self, user_id: Uuid) -> Vec<EventType> {
        self.notifications
            .list_notifications(user_id, 50, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.event_type)
            .collect()
    }
}
