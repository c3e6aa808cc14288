use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use opsdesk_contract::{ListKind, OperationResult};
use opsdesk_transfer::{FileTransferService, TransferError};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: FileTransferService,
    pub started_at: String,
}

impl AppState {
    pub fn new(service: FileTransferService) -> Self {
        Self {
            service,
            started_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Allow a dashboard served from another origin to call the API.
    pub permissive_cors: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverFileRequest {
    file_name: String,
    destination_group: String,
}

type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let ops = Router::new()
        .route("/notifications", get(get_notifications))
        .route("/queue", get(get_queue))
        .route("/acknowledge/{file_id}", post(acknowledge))
        .route("/transfer/{file_id}", post(transfer))
        .route("/files", post(discover_file))
        .route("/files/{file_id}", get(get_file));

    let router = Router::new()
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .nest("/api/ops", ops)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if options.permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn health_live(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "live",
        "startedAt": state.started_at,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.service.ping().await.is_ok();
    let payload = Json(json!({
        "status": if ready { "ready" } else { "degraded" },
        "timestamp": Utc::now().to_rfc3339()
    }));

    if ready {
        (StatusCode::OK, payload).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, payload).into_response()
    }
}

async fn get_notifications(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list(&state, ListKind::Notifications).await
}

async fn get_queue(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list(&state, ListKind::Queue).await
}

async fn list(state: &AppState, kind: ListKind) -> Result<impl IntoResponse, ApiError> {
    let records = state.service.list(kind).await.map_err(internal_error)?;
    Ok((StatusCode::OK, Json(records)))
}

async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.get(&file_id).await.map_err(internal_error)? {
        Some(record) => Ok((StatusCode::OK, Json(record))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "file_not_found" })),
        )),
    }
}

async fn acknowledge(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .service
        .acknowledge(&file_id)
        .await
        .map_err(|err| mutation_error(&file_id, err))?;
    Ok((StatusCode::OK, Json(OperationResult::ok(record))))
}

async fn transfer(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .service
        .initiate_transfer(&file_id)
        .await
        .map_err(|err| mutation_error(&file_id, err))?;
    Ok((StatusCode::OK, Json(OperationResult::ok(record))))
}

async fn discover_file(
    State(state): State<AppState>,
    Json(payload): Json<DiscoverFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.file_name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "file_name_required" })),
        ));
    }

    let record = state
        .service
        .discover_new_file(&payload.file_name, &payload.destination_group)
        .await
        .map_err(internal_error)?;
    info!(file_id = %record.id, "remote file registered");
    Ok((StatusCode::CREATED, Json(record)))
}

fn mutation_error(file_id: &str, err: TransferError) -> ApiError {
    if err.is_rejection() {
        warn!(file_id, reason = %err, "mutation rejected");
        (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": err.rejection_message() })),
        )
    } else {
        internal_error(err)
    }
}

fn internal_error(err: TransferError) -> ApiError {
    error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.rejection_message() })),
    )
}
