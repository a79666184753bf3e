use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "service_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    // Repairs & installation
    Plumbing,
    Electrical,
    Carpentry,
    Painting,
    Masonry,
    Tiling,
    Roofing,
    Welding,
    HvacRepair,
    ApplianceRepair,

    // Home care
    Cleaning,
    PestControl,
    Gardening,
    Moving,

    // Personal services
    Tutoring,
    Beauty,
    Driving,

    Other,
}

impl ServiceCategory {
    pub fn to_str(&self) -> &str {
        match self {
            ServiceCategory::Plumbing => "plumbing",
            ServiceCategory::Electrical => "electrical",
            ServiceCategory::Carpentry => "carpentry",
            ServiceCategory::Painting => "painting",
            ServiceCategory::Masonry => "masonry",
            ServiceCategory::Tiling => "tiling",
            ServiceCategory::Roofing => "roofing",
            ServiceCategory::Welding => "welding",
            ServiceCategory::HvacRepair => "hvac_repair",
            ServiceCategory::ApplianceRepair => "appliance_repair",

            ServiceCategory::Cleaning => "cleaning",
            ServiceCategory::PestControl => "pest_control",
            ServiceCategory::Gardening => "gardening",
            ServiceCategory::Moving => "moving",

            ServiceCategory::Tutoring => "tutoring",
            ServiceCategory::Beauty => "beauty",
            ServiceCategory::Driving => "driving",

            ServiceCategory::Other => "other",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    Disputed,
}

impl JobStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Assigned => "assigned",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Disputed => "disputed",
        }
    }

    /// The edges of the job state machine. `Disputed`, `Completed` and
    /// `Cancelled` have no outgoing edges.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Open, JobStatus::Assigned)
                | (JobStatus::Open, JobStatus::Cancelled)
                | (JobStatus::Assigned, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::Assigned, JobStatus::Disputed)
                | (JobStatus::InProgress, JobStatus::Disputed)
        )
    }

    /// A booking exists for a job exactly when its status is one of these.
    pub fn has_booking(self) -> bool {
        matches!(
            self,
            JobStatus::Assigned | JobStatus::InProgress | JobStatus::Completed | JobStatus::Disputed
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
            BidStatus::Withdrawn => "withdrawn",
        }
    }

    /// Whether the bid still occupies the worker's single slot on its job.
    pub fn holds_slot(self) -> bool {
        self != BidStatus::Withdrawn
    }
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    InProgress,
    Completed,
}

/// Which side of a job the acting user is on. Decided per operation from
/// the job and booking rows, never from a stored role flag.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Customer,
    Worker,
}

/// Longest title, city or province a job may carry.
pub const MAX_SHORT_TEXT_LENGTH: usize = 100;

/// Money columns are `NUMERIC(14, 2)`: amounts are kept to the cent and
/// must stay below 10^12.
pub fn to_cents(amount: &BigDecimal) -> BigDecimal {
    amount.round(2)
}

pub fn is_storable_amount(amount: &BigDecimal) -> bool {
    *amount < BigDecimal::from(1_000_000_000_000i64)
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub budget_min: BigDecimal,
    pub budget_max: BigDecimal,
    pub location_city: String,
    pub location_province: String,
    pub location_address: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new job, already validated by the lifecycle manager.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub budget_min: BigDecimal,
    pub budget_max: BigDecimal,
    pub location_city: String,
    pub location_province: String,
    pub location_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Bid {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub amount: BigDecimal,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// Advisory only: bids outside the posted range are still accepted.
    pub fn is_within_budget(&self, job: &Job) -> bool {
        self.amount >= job.budget_min && self.amount <= job.budget_max
    }
}

#[derive(Debug, Clone)]
pub struct NewBid {
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub amount: BigDecimal,
    pub proposal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub job_id: Uuid,
    pub bid_id: Uuid,
    pub worker_id: Uuid,
    pub customer_id: Uuid,
    pub agreed_amount: BigDecimal,
    pub status: BookingStatus,
    pub customer_confirmed_at: Option<DateTime<Utc>>,
    pub worker_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn party_of(&self, actor_id: Uuid) -> Option<Party> {
        if actor_id == self.customer_id {
            Some(Party::Customer)
        } else if actor_id == self.worker_id {
            Some(Party::Worker)
        } else {
            None
        }
    }

    pub fn counterpart(&self, party: Party) -> Uuid {
        match party {
            Party::Customer => self.worker_id,
            Party::Worker => self.customer_id,
        }
    }

    pub fn is_confirmed_by_both(&self) -> bool {
        self.customer_confirmed_at.is_some() && self.worker_confirmed_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct WorkerProfile {
    pub worker_id: Uuid,
    pub city: String,
    pub province: String,
    pub services: Vec<ServiceCategory>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct BookingMessage {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the acceptance unit of work changed, returned after commit.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptanceRecord {
    pub job: Job,
    pub accepted_bid: Bid,
    pub rejected_bids: Vec<Bid>,
    pub booking: Booking,
}

/// Result of cancelling an open job: the job plus the bids it closed out.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationRecord {
    pub job: Job,
    pub rejected_bids: Vec<Bid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRecord {
    pub job: Job,
    pub booking: Booking,
    /// False when only one party has confirmed so far.
    pub completed: bool,
}
