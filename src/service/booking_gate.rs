// service/booking_gate.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::marketdb::MarketExt,
    models::marketmodel::*,
    service::error::ServiceError,
};

pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Bookings and the rule that contact between parties only opens once a
/// booking exists. Bids alone never unlock messaging.
#[derive(Debug, Clone)]
pub struct BookingGate {
    store: Arc<dyn MarketExt>,
}

impl BookingGate {
    pub fn new(store: Arc<dyn MarketExt>) -> Self {
        Self { store }
    }

    pub async fn can_message(&self, actor_id: Uuid, booking_id: Uuid) -> Result<bool, ServiceError> {
        let booking = match self.store.get_booking_by_id(booking_id).await? {
            Some(booking) => booking,
            None => return Ok(false),
        };

        if booking.party_of(actor_id).is_none() {
            return Ok(false);
        }

        let job = self.store.get_job_by_id(booking.job_id).await?;
        Ok(matches!(job, Some(job) if job.status != JobStatus::Cancelled))
    }

    pub async fn get_booking(&self, actor_id: Uuid, booking_id: Uuid) -> Result<Booking, ServiceError> {
        let booking = self
            .store
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        if booking.party_of(actor_id).is_none() {
            return Err(ServiceError::forbidden(actor_id, format!("view booking {}", booking_id)));
        }

        Ok(booking)
    }

    pub async fn list_bookings(&self, actor_id: Uuid) -> Result<Vec<Booking>, ServiceError> {
        self.store.get_user_bookings(actor_id).await
    }

    pub async fn send_message(
        &self,
        actor_id: Uuid,
        booking_id: Uuid,
        body: String,
    ) -> Result<BookingMessage, ServiceError> {
        let body = body.trim().to_string();
        if body.is_empty() || body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Message must be between 1 and {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        self.ensure_can_message(actor_id, booking_id).await?;

        let message = self.store.create_message(booking_id, actor_id, body).await?;
        tracing::debug!("Message {} posted on booking {}", message.id, booking_id);

        Ok(message)
    }

    pub async fn list_messages(
        &self,
        actor_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Vec<BookingMessage>, ServiceError> {
        self.ensure_can_message(actor_id, booking_id).await?;
        self.store.get_booking_messages(booking_id).await
    }

    async fn ensure_can_message(&self, actor_id: Uuid, booking_id: Uuid) -> Result<(), ServiceError> {
        if self.can_message(actor_id, booking_id).await? {
            Ok(())
        } else {
            Err(ServiceError::forbidden(
                actor_id,
                format!("message on booking {}", booking_id),
            ))
        }
    }
}
