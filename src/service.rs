// service.rs
pub mod acceptance;
pub mod background_jobs;
pub mod bid_ledger;
pub mod booking_gate;
pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod notification_service;

#[cfg(test)]
pub mod test_support;
