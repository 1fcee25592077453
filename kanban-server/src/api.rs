//! HTTP API: axum router and handlers for `/api/tasks`.
//!
//! | Method | Path | Success | Errors |
//! |--------|------|---------|--------|
//! | GET | `/api/tasks` | 200 list | 500 injected |
//! | GET | `/api/tasks/{id}` | 200 task | 404, 500 |
//! | POST | `/api/tasks` | 201 task | 400, 500 |
//! | PATCH | `/api/tasks/{id}` | 200 task | 400, 404, 500 |
//! | DELETE | `/api/tasks/{id}` | 204 | 404, 500 |
//!
//! Every error body is `{"error": "..."}`. Injected failures are rolled
//! before the request is looked at, so they hit unknown ids too.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use kanban_proto::codec::ErrorBody;
use kanban_proto::fault::roll_failure;
use kanban_proto::{NewTask, Task, TaskId, TaskPatch, TaskValidationError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::store::{TableError, TaskTable};

/// Message returned for injected failures.
pub const SIMULATED_ERROR: &str = "Simulated server error";

/// Shared server state.
pub struct AppState {
    /// Authoritative task list.
    pub table: TaskTable,
    rates: FailureRates,
}

/// Probability of an injected 500, per request class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRates {
    /// Applied to GET requests.
    pub read: f64,
    /// Applied to POST, PATCH and DELETE requests.
    pub write: f64,
}

impl FailureRates {
    /// No injected failures.
    pub const NONE: Self = Self {
        read: 0.0,
        write: 0.0,
    };
}

impl AppState {
    /// Creates server state over `table`.
    #[must_use]
    pub const fn new(table: TaskTable, rates: FailureRates) -> Self {
        Self { table, rates }
    }

    /// The configured failure rates.
    #[must_use]
    pub const fn rates(&self) -> FailureRates {
        self.rates
    }

    fn inject_read(&self) -> Result<(), ApiError> {
        inject(self.rates.read, "GET")
    }

    fn inject_write(&self, method: &'static str) -> Result<(), ApiError> {
        inject(self.rates.write, method)
    }
}

fn inject(rate: f64, method: &'static str) -> Result<(), ApiError> {
    if roll_failure(rate) {
        tracing::warn!(method, "injecting simulated failure");
        return Err(ApiError::Simulated);
    }
    Ok(())
}

/// Handler errors, rendered as `{"error": "..."}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Injected failure.
    #[error("Simulated server error")]
    Simulated,
    /// Unknown task id.
    #[error("Task not found")]
    NotFound,
    /// Field validation failed.
    #[error(transparent)]
    Invalid(#[from] TaskValidationError),
    /// The body was not valid JSON for the endpoint.
    #[error("{0}")]
    BadRequest(String),
}

impl From<TableError> for ApiError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::NotFound(_) => Self::NotFound,
            TableError::Invalid(e) => Self::Invalid(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Simulated => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Invalid(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

type AppResult<T> = Result<T, ApiError>;

async fn list_tasks(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Task>>> {
    state.inject_read()?;
    Ok(Json(state.table.list().await))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> AppResult<Json<Task>> {
    state.inject_read()?;
    state.table.get(&id).await.map(Json).ok_or(ApiError::NotFound)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Task>)> {
    state.inject_write("POST")?;
    let Json(new) = body?;
    let task = state.table.insert(new).await?;
    tracing::info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> AppResult<Json<Task>> {
    state.inject_write("PATCH")?;
    let Json(patch) = body?;
    let task = state.table.update(&id, &patch).await?;
    tracing::info!(task_id = %id, status = %task.status, "task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TaskId>,
) -> AppResult<StatusCode> {
    state.inject_write("DELETE")?;
    state.table.remove(&id).await?;
    tracing::info!(task_id = %id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the API router with permissive CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the server with the given state.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
