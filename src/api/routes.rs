//! REST endpoints: register a calculation, poll a task, list tasks.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::Error;
use crate::tasks::{CalcRequest, Outcome, QueryService, TaskId, TaskList, TaskRegistry};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: TaskRegistry,
    pub query: QueryService,
}

/// Build the Axum router for the task API.
pub fn api_routes(registry: TaskRegistry, query: QueryService) -> Router {
    let state = AppState { registry, query };

    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/task/{id}", get(task_status))
        .route("/task_list", get(task_list))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Infrastructure failure surfaced to the caller as a 500.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "magnit-calc"
    }))
}

// ── Tasks ───────────────────────────────────────────────────────────────

async fn register(
    State(state): State<AppState>,
    Json(request): Json<CalcRequest>,
) -> Result<Json<TaskId>, ApiError> {
    let id = state.registry.submit(request).await?;
    Ok(Json(id))
}

/// `2.0` when done, `{"error": "task_error", "msg": …}` when failed, `null`
/// otherwise.
async fn task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let task_id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => {
            debug!(id = %id, "Rejected malformed task id");
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "Invalid task ID"})),
            )
                .into_response());
        }
    };

    let body = match state.query.get_status(task_id).await? {
        Some(Outcome::Done { result }) => json!(result),
        Some(Outcome::Failed { error }) => json!({"error": "task_error", "msg": error}),
        None => serde_json::Value::Null,
    };
    Ok(Json(body).into_response())
}

async fn task_list(State(state): State<AppState>) -> Result<Json<TaskList>, ApiError> {
    Ok(Json(state.query.list_tasks().await?))
}
