use crate::types::{
    ActivateRequest, ErrorResponse, ExplicitRequest, LeaderboardQuery, MessageRequest, ReminderRequest,
    UserRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sienna_memory::StoreError;
use sienna_core::Reminder;
use sienna_reasoning::engine::{
    ActivationOutcome, DailyOutcome, ExplicitOutcome, Outcome, ReminderOutcome, ResetOutcome,
};
use sienna_reasoning::ChatEngine;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// HTTP surface for the dispatch layer.
///
/// Every trigger is answered synchronously with the outbound segments (or
/// structured data) as JSON. Delivery to the user is the caller's job.
///
/// - `POST /message`, `/activate`, `/daily`, `/reminders`, `/explicit`, `/reset`
/// - `GET /reminders/{user_id}`, `/leaderboard?page=`, `/rank/{user_id}`
/// - `GET /health`
pub struct GatewayServer {
    engine: Arc<ChatEngine>,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(engine: Arc<ChatEngine>, host: &str, port: u16) -> Self {
        Self {
            engine,
            host: host.to_string(),
            port,
        }
    }

    pub fn router(&self) -> Router {
        router(self.engine.clone())
    }

    /// Bind and serve in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.host, self.port);
        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!("Gateway failed to bind {}: {}", addr, e);
                    return;
                }
            };
            tracing::info!("Gateway listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Gateway server error: {}", e);
            }
        })
    }
}

pub fn router(engine: Arc<ChatEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/message", post(handle_message))
        .route("/activate", post(activate))
        .route("/daily", post(claim_daily))
        .route("/reminders", post(set_reminder))
        .route("/reminders/:user_id", get(list_reminders))
        .route("/explicit", post(set_explicit))
        .route("/reset", post(request_reset))
        .route("/leaderboard", get(leaderboard))
        .route("/rank/:user_id", get(rank))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

// ============================================================================
// Errors
// ============================================================================

/// A store failure turned into a JSON error body.
struct ApiError(StatusCode, String);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match e {
            StoreError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            StoreError::UnknownUser(_) => StatusCode::NOT_FOUND,
            StoreError::Corrupt { .. } => StatusCode::CONFLICT,
            StoreError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Gateway request failed: {}", e);
        } else {
            tracing::debug!("Gateway request rejected: {}", e);
        }
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn ok<T: Serialize>(value: T) -> ApiResult<T> {
    Ok(Json(value))
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

/// POST /message: one direct message. Always answers with segments.
async fn handle_message(
    State(engine): State<Arc<ChatEngine>>,
    Json(msg): Json<MessageRequest>,
) -> impl IntoResponse {
    Json(engine.handle_message(&msg.user_id, &msg.text).await)
}

async fn activate(
    State(engine): State<Arc<ChatEngine>>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<Outcome<ActivationOutcome>> {
    ok(engine.activate(&req.user_id, &req.code).await?)
}

async fn claim_daily(
    State(engine): State<Arc<ChatEngine>>,
    Json(req): Json<UserRequest>,
) -> ApiResult<Outcome<DailyOutcome>> {
    ok(engine.claim_daily(&req.user_id).await?)
}

async fn set_reminder(
    State(engine): State<Arc<ChatEngine>>,
    Json(req): Json<ReminderRequest>,
) -> ApiResult<Outcome<ReminderOutcome>> {
    ok(engine.set_reminder(&req.user_id, &req.time, &req.message).await?)
}

async fn list_reminders(
    State(engine): State<Arc<ChatEngine>>,
    Path(user_id): Path<String>,
) -> ApiResult<Outcome<Vec<Reminder>>> {
    ok(engine.list_reminders(&user_id).await?)
}

async fn set_explicit(
    State(engine): State<Arc<ChatEngine>>,
    Json(req): Json<ExplicitRequest>,
) -> ApiResult<Outcome<ExplicitOutcome>> {
    ok(engine.set_explicit_mode(&req.user_id, req.enabled).await?)
}

async fn request_reset(
    State(engine): State<Arc<ChatEngine>>,
    Json(req): Json<UserRequest>,
) -> ApiResult<Outcome<ResetOutcome>> {
    ok(engine.request_reset(&req.user_id).await?)
}

async fn leaderboard(
    State(engine): State<Arc<ChatEngine>>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    Json(engine.leaderboard(query.page))
}

async fn rank(State(engine): State<Arc<ChatEngine>>, Path(user_id): Path<String>) -> Response {
    match engine.rank(&user_id) {
        Some(entry) => Json(entry).into_response(),
        None => ApiError(StatusCode::NOT_FOUND, format!("no ranked user {}", user_id)).into_response(),
    }
}
