use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "lifecycle_event_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    BidAccepted,
    BidRejected,
    JobAssigned,
    JobCancelled,
    JobStarted,
    CompletionConfirmed,
    JobCompleted,
    JobDisputed,
}

impl EventType {
    pub fn to_str(&self) -> &str {
        match self {
            EventType::BidAccepted => "bid-accepted",
            EventType::BidRejected => "bid-rejected",
            EventType::JobAssigned => "job-assigned",
            EventType::JobCancelled => "job-cancelled",
            EventType::JobStarted => "job-started",
            EventType::CompletionConfirmed => "completion-confirmed",
            EventType::JobCompleted => "job-completed",
            EventType::JobDisputed => "job-disputed",
        }
    }
}

/// Outbound event handed to the notification dispatcher after a state
/// change has committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub job_id: Uuid,
    pub bid_id: Option<Uuid>,
    pub recipient_id: Uuid,
    pub payload: serde_json::Value,
}

impl LifecycleEvent {
    pub fn new(
        event_type: EventType,
        job_id: Uuid,
        bid_id: Option<Uuid>,
        recipient_id: Uuid,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            job_id,
            bid_id,
            recipient_id,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub event_type: EventType,
    pub job_id: Uuid,
    pub bid_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
