use chrono::{DateTime, Utc};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;
use validator::Validate;

use crate::{error::HttpError, models::marketmodel::*};

// Job DTOs
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateJobDto {
    pub category: ServiceCategory,

    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Budget must not be negative"))]
    pub budget_min: f64,

    #[validate(range(min = 0.0, message = "Budget must not be negative"))]
    pub budget_max: f64,

    #[validate(length(min = 1, max = 100, message = "City must be between 1 and 100 characters"))]
    pub location_city: String,

    #[validate(length(min = 1, max = 100, message = "Province must be between 1 and 100 characters"))]
    pub location_province: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub location_address: String,
}

impl CreateJobDto {
    pub fn into_new_job(self) -> Result<NewJob, HttpError> {
        Ok(NewJob {
            category: self.category,
            title: self.title,
            description: self.description,
            budget_min: to_amount(self.budget_min)?,
            budget_max: to_amount(self.budget_max)?,
            location_city: self.location_city,
            location_province: self.location_province,
            location_address: self.location_address,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransitionJobDto {
    pub status: JobStatus,
}

// Bid DTOs
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SubmitBidDto {
    #[validate(range(min = 0.01, message = "Bid amount must be greater than zero"))]
    pub amount: f64,

    #[validate(length(min = 1, max = 2000, message = "Proposal must be between 1 and 2000 characters"))]
    pub proposal: String,
}

/// A bid as shown to callers, with the advisory budget check attached.
#[derive(Debug, Serialize, Deserialize)]
pub struct BidResponseDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub amount: BigDecimal,
    pub proposal: String,
    pub status: BidStatus,
    pub within_budget: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BidResponseDto {
    pub fn from_bid(bid: Bid, job: Option<&Job>) -> Self {
        let within_budget = job.map(|job| bid.is_within_budget(job));
        Self {
            id: bid.id,
            job_id: bid.job_id,
            worker_id: bid.worker_id,
            amount: bid.amount,
            proposal: bid.proposal,
            status: bid.status,
            within_budget,
            created_at: bid.created_at,
            updated_at: bid.updated_at,
        }
    }
}

// Messaging DTOs
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SendMessageDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CanMessageDto {
    pub booking_id: Uuid,
    pub can_message: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

/// Money arrives as JSON numbers and is stored to the cent.
pub fn to_amount(value: f64) -> Result<BigDecimal, HttpError> {
    BigDecimal::from_f64(value)
        .map(|amount| amount.round(2))
        .ok_or_else(|| HttpError::bad_request(format!("{} is not a valid amount", value)))
}
