use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use karigar::{
    config::Config,
    db::memorydb::MemoryStore,
    models::marketmodel::ServiceCategory,
    routes::create_router,
    utils::token::create_token,
    AppState,
};

const SECRET: &str = "api-test-secret";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        port: 0,
        min_proposal_length: 20,
        notification_retry_secs: 30,
        notification_max_attempts: 3,
        log_level: "debug".to_string(),
        allowed_origins: Vec::new(),
    }
}

fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(store.clone(), test_config()));
    TestApp {
        router: create_router(state),
        store,
    }
}

fn token_for(actor: Uuid) -> String {
    create_token(&actor.to_string(), SECRET.as_bytes(), 3600).unwrap()
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        actor: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(actor)));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post_job(&self, customer: Uuid) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/jobs",
                Some(customer),
                Some(json!({
                    "category": "plumbing",
                    "title": "Fix kitchen sink",
                    "description": "Leaking trap under the kitchen sink",
                    "budget_min": 5000.0,
                    "budget_max": 8000.0,
                    "location_city": "Lahore",
                    "location_province": "Punjab",
                    "location_address": "12 Mall Road"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    async fn bid(&self, job_id: Uuid, worker: Uuid, amount: f64) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/api/jobs/{}/bids", job_id),
            Some(worker),
            Some(json!({
                "amount": amount,
                "proposal": "Licensed plumber, can come this evening"
            })),
        )
        .await
    }
}

fn id_of(body: &Value) -> Uuid {
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_token() {
    let app = spawn_app();
    let (status, body) = app.call(Method::GET, "/api/jobs/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "fail");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/jobs/mine")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_cookie_is_accepted() {
    let app = spawn_app();
    let actor = Uuid::new_v4();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/jobs/mine")
                .header(header::COOKIE, format!("token={}", token_for(actor)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bid_acceptance_flow_over_http() {
    let app = spawn_app();
    let customer = Uuid::new_v4();
    let (w1, w2) = (Uuid::new_v4(), Uuid::new_v4());
    let job_id = app.post_job(customer).await;

    let (status, b1) = app.bid(job_id, w1, 6000.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(b1["data"]["within_budget"], true);
    let (status, b2) = app.bid(job_id, w2, 9500.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(b2["data"]["within_budget"], false);

    let (status, listed) = app
        .call(Method::GET, &format!("/api/jobs/{}/bids", job_id), Some(customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);

    let (status, accepted) = app
        .call(
            Method::POST,
            &format!("/api/bids/{}/accept", id_of(&b1)),
            Some(customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", accepted);
    assert_eq!(accepted["data"]["status"], "confirmed");
    assert_eq!(accepted["data"]["worker_id"], w1.to_string());
    assert_eq!(accepted["data"]["customer_id"], customer.to_string());
    let booking_id = accepted["data"]["id"].as_str().unwrap().to_string();

    let (_, job) = app
        .call(Method::GET, &format!("/api/jobs/{}", job_id), Some(customer), None)
        .await;
    assert_eq!(job["data"]["status"], "assigned");

    let (status, err) = app
        .call(
            Method::POST,
            &format!("/api/bids/{}/accept", id_of(&b2)),
            Some(customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "job_not_open");

    let (status, gate) = app
        .call(
            Method::GET,
            &format!("/api/bookings/{}/can-message", booking_id),
            Some(w2),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gate["data"]["can_message"], false);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/bookings/{}/messages", booking_id),
            Some(w1),
            Some(json!({ "body": "On my way" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, feed) = app.call(Method::GET, "/api/notifications", Some(w2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["data"][0]["event_type"], "bid-rejected");

    assert_eq!(app.store.all_bookings().await.len(), 1);
}

#[tokio::test]
async fn duplicate_bid_is_a_conflict() {
    let app = spawn_app();
    let job_id = app.post_job(Uuid::new_v4()).await;
    let worker = Uuid::new_v4();

    let (status, _) = app.bid(job_id, worker, 6000.0).await;
    assert_eq!(status, StatusCode::OK);
    let (status, err) = app.bid(job_id, worker, 5500.0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "duplicate_bid");
}

#[tokio::test]
async fn capability_and_validation_errors_map_to_statuses() {
    let app = spawn_app();
    let customer = Uuid::new_v4();
    let job_id = app.post_job(customer).await;

    let (status, err) = app.bid(job_id, Uuid::new_v4(), 0.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation_error");

    let (_, bid) = app.bid(job_id, Uuid::new_v4(), 6000.0).await;
    let (status, err) = app
        .call(
            Method::POST,
            &format!("/api/bids/{}/accept", id_of(&bid)),
            Some(Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "forbidden");

    let (status, err) = app
        .call(
            Method::GET,
            &format!("/api/jobs/{}", Uuid::new_v4()),
            Some(customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "not_found");

    let (status, err) = app
        .call(
            Method::POST,
            &format!("/api/jobs/{}/transition", job_id),
            Some(customer),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "invalid_transition");
}

#[tokio::test]
async fn eligible_jobs_follow_the_worker_profile() {
    let app = spawn_app();
    let job_id = app.post_job(Uuid::new_v4()).await;

    let lahore = Uuid::new_v4();
    app.store
        .put_worker_profile(lahore, "Lahore", "Punjab", vec![ServiceCategory::Plumbing])
        .await;
    let karachi = Uuid::new_v4();
    app.store
        .put_worker_profile(karachi, "Karachi", "Sindh", vec![ServiceCategory::Plumbing])
        .await;

    let (status, body) = app.call(Method::GET, "/api/jobs/eligible", Some(lahore), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], job_id.to_string());

    let (_, body) = app.call(Method::GET, "/api/jobs/eligible", Some(karachi), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let app = spawn_app();
    let customer = Uuid::new_v4();
    let job_id = app.post_job(customer).await;

    let (status, err) = app
        .call(
            Method::POST,
            &format!("/api/jobs/{}/transition", job_id),
            Some(customer),
            Some(json!({ "status": "bogus" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["status"], "fail");
    assert_eq!(err["code"], "validation_error");

    let (status, err) = app
        .call(
            Method::POST,
            &format!("/api/jobs/{}/bids", job_id),
            Some(Uuid::new_v4()),
            Some(json!({ "amount": "x", "proposal": "Licensed plumber, can come today" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation_error");

    let (status, err) = app
        .call(Method::GET, "/api/jobs/not-a-uuid", Some(customer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation_error");
}

#[tokio::test]
async fn oversized_budget_is_rejected_before_storage() {
    let app = spawn_app();
    let (status, err) = app
        .call(
            Method::POST,
            "/api/jobs",
            Some(Uuid::new_v4()),
            Some(json!({
                "category": "plumbing",
                "title": "Fix kitchen sink",
                "description": "Leaking trap under the kitchen sink",
                "budget_min": 5000.0,
                "budget_max": 1e13,
                "location_city": "Lahore",
                "location_province": "Punjab",
                "location_address": "12 Mall Road"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation_error");
}
