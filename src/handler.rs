pub mod market;
pub mod notifications;
