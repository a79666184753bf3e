// handler/market.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::marketdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn market_handler() -> Router {
    Router::new()
        // Jobs
        .route("/jobs", post(create_job))
        .route("/jobs/mine", get(get_my_jobs))
        .route("/jobs/eligible", get(get_eligible_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/bids", post(submit_bid).get(get_job_bids))
        .route("/jobs/:job_id/transition", post(transition_job))
        // Bids
        .route("/bids/mine", get(get_my_bids))
        .route("/bids/:bid_id/withdraw", post(withdraw_bid))
        .route("/bids/:bid_id/accept", post(accept_bid))
        .route("/bids/:bid_id/reject", post(reject_bid))
        // Bookings
        .route("/bookings", get(get_my_bookings))
        .route("/bookings/:booking_id", get(get_booking))
        .route("/bookings/:booking_id/can-message", get(can_message))
        .route(
            "/bookings/:booking_id/messages",
            get(get_messages).post(send_message),
        )
}

// Job handlers
pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Json(body), _): WithRejection<Json<CreateJobDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .lifecycle
        .create_job(auth.actor_id, body.into_new_job()?)
        .await?;

    Ok(Json(ApiResponse::success("Job posted successfully", job)))
}

pub async fn get_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.lifecycle.list_customer_jobs(auth.actor_id).await?;

    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn get_eligible_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.catalog.list_eligible_jobs(auth.actor_id).await?;

    Ok(Json(ApiResponse::success("Eligible jobs retrieved successfully", jobs)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.lifecycle.get_job(job_id).await?;

    Ok(Json(ApiResponse::success("Job retrieved successfully", job)))
}

pub async fn transition_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<TransitionJobDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .lifecycle
        .transition_job(job_id, auth.actor_id, body.status)
        .await?;

    Ok(Json(ApiResponse::success("Job updated successfully", job)))
}

// Bid handlers
pub async fn submit_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<SubmitBidDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bid = app_state
        .bids
        .submit_bid(job_id, auth.actor_id, to_amount(body.amount)?, body.proposal)
        .await?;
    let job = app_state.lifecycle.get_job(job_id).await?;

    Ok(Json(ApiResponse::success(
        "Bid submitted successfully",
        BidResponseDto::from_bid(bid, Some(&job)),
    )))
}

pub async fn get_job_bids(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let bids = app_state.bids.list_for_job(job_id, auth.actor_id).await?;
    let job = app_state.lifecycle.get_job(job_id).await?;

    let bids: Vec<BidResponseDto> = bids
        .into_iter()
        .map(|bid| BidResponseDto::from_bid(bid, Some(&job)))
        .collect();

    Ok(Json(ApiResponse::success("Bids retrieved successfully", bids)))
}

pub async fn get_my_bids(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let bids: Vec<BidResponseDto> = app_state
        .bids
        .list_for_worker(auth.actor_id)
        .await?
        .into_iter()
        .map(|bid| BidResponseDto::from_bid(bid, None))
        .collect();

    Ok(Json(ApiResponse::success("Bids retrieved successfully", bids)))
}

pub async fn withdraw_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(bid_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let bid = app_state.bids.withdraw_bid(bid_id, auth.actor_id).await?;

    Ok(Json(ApiResponse::success(
        "Bid withdrawn successfully",
        BidResponseDto::from_bid(bid, None),
    )))
}

pub async fn accept_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(bid_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let record = app_state.acceptance.accept_bid(bid_id, auth.actor_id).await?;

    Ok(Json(ApiResponse::success(
        "Bid accepted, booking created",
        record.booking,
    )))
}

pub async fn reject_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(bid_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let bid = app_state.bids.reject_bid(bid_id, auth.actor_id).await?;

    Ok(Json(ApiResponse::success(
        "Bid rejected",
        BidResponseDto::from_bid(bid, None),
    )))
}

// Booking handlers
pub async fn get_my_bookings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let bookings = app_state.gate.list_bookings(auth.actor_id).await?;

    Ok(Json(ApiResponse::success("Bookings retrieved successfully", bookings)))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.gate.get_booking(auth.actor_id, booking_id).await?;

    Ok(Json(ApiResponse::success("Booking retrieved successfully", booking)))
}

pub async fn can_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let can_message = app_state.gate.can_message(auth.actor_id, booking_id).await?;

    Ok(Json(ApiResponse::success(
        "Messaging status retrieved",
        CanMessageDto {
            booking_id,
            can_message,
        },
    )))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state.gate.list_messages(auth.actor_id, booking_id).await?;

    Ok(Json(ApiResponse::success("Messages retrieved successfully", messages)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<SendMessageDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .gate
        .send_message(auth.actor_id, booking_id, body.body)
        .await?;

    Ok(Json(ApiResponse::success("Message sent", message)))
}
