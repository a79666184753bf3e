pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::{marketdb::MarketExt, notificationdb::NotificationExt};
use service::{
    acceptance::AcceptanceCoordinator,
    bid_ledger::BidLedger,
    booking_gate::BookingGate,
    catalog::CatalogFilter,
    lifecycle::JobLifecycleManager,
    notification_service::NotificationService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    // Services
    pub lifecycle: Arc<JobLifecycleManager>,
    pub bids: Arc<BidLedger>,
    pub catalog: Arc<CatalogFilter>,
    pub acceptance: Arc<AcceptanceCoordinator>,
    pub gate: Arc<BookingGate>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    /// Wires every service over one store. Postgres in production,
    /// `MemoryStore` in tests.
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: MarketExt + NotificationExt + 'static,
    {
        let notification_service = Arc::new(NotificationService::new(
            store.clone(),
            config.notification_max_attempts,
        ));

        let lifecycle = Arc::new(JobLifecycleManager::new(
            store.clone(),
            notification_service.clone(),
        ));
        let bids = Arc::new(BidLedger::new(
            store.clone(),
            notification_service.clone(),
            config.min_proposal_length,
        ));
        let catalog = Arc::new(CatalogFilter::new(store.clone()));
        let acceptance = Arc::new(AcceptanceCoordinator::new(
            store.clone(),
            notification_service.clone(),
        ));
        let gate = Arc::new(BookingGate::new(store));

        Self {
            env: config,
            lifecycle,
            bids,
            catalog,
            acceptance,
            gate,
            notification_service,
        }
    }
}
