use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::api::signals::SignalEvent;
use crate::app::CatalogApp;
use crate::logic::coordinator::{CoordinatorError, ModalSnapshot, SaveEvent};
use crate::model::{Attachment, EntityKind, FieldRecord};
use crate::repository::{RepositoryError, SavedRecord, UploadError};
use crate::store::{BackendError, DisplayInfo};

pub type AppState = Arc<CatalogApp>;

type ApiError = (StatusCode, Json<ErrorResponse>);

const MAX_POLL_WAIT: Duration = Duration::from_secs(30);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// One translated line per problem, for the modal's notice area
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub kind: String,
    /// Existing row to edit; omitted for a new record
    pub record: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub after: Option<u64>,
    /// Long-poll wait in milliseconds; 0 returns immediately
    pub wait_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    pub events: Vec<SignalEvent>,
    pub latest: u64,
}

fn parse_kind(kind: &str) -> Result<EntityKind, ApiError> {
    kind.parse::<EntityKind>()
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new(&e.to_string()))))
}

fn status_for(err: &CoordinatorError) -> StatusCode {
    match err {
        CoordinatorError::UnknownKind(_) => StatusCode::NOT_FOUND,
        CoordinatorError::NoActiveSession | CoordinatorError::NotOpen | CoordinatorError::SaveInFlight => {
            StatusCode::CONFLICT
        }
        CoordinatorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoordinatorError::Repository(err) => match err {
            RepositoryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RepositoryError::Identity(_) | RepositoryError::ActorNotRegistered => StatusCode::UNAUTHORIZED,
            RepositoryError::Upload(UploadError::StorageUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            RepositoryError::Upload(UploadError::Backend(err)) | RepositoryError::Backend(err) => match err {
                BackendError::ForeignKeyViolation { .. } => StatusCode::UNAUTHORIZED,
                BackendError::UniquenessViolation { .. } => StatusCode::CONFLICT,
                BackendError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                BackendError::NotFound => StatusCode::NOT_FOUND,
                BackendError::RelationMissing { .. } | BackendError::Unknown { .. } => StatusCode::BAD_GATEWAY,
            },
            RepositoryError::Upload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        },
    }
}

fn coordinator_error(err: CoordinatorError) -> ApiError {
    let status = status_for(&err);
    let messages = err.user_messages();
    (
        status,
        Json(ErrorResponse {
            error: messages.first().cloned().unwrap_or_else(|| err.to_string()),
            messages,
        }),
    )
}

pub async fn list_entities(
    State(app): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<ListResponse<Value>>, ApiError> {
    let kind = parse_kind(&kind)?;
    match app.coordinator.list(kind).await {
        Ok(items) => {
            let total = items.len();
            Ok(Json(ListResponse { items, total }))
        }
        Err(e) => Err(coordinator_error(e)),
    }
}

pub async fn delete_entity(
    State(app): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    app.coordinator
        .delete(kind, &id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(coordinator_error)
}

pub async fn get_modal(State(app): State<AppState>) -> Json<ModalSnapshot> {
    Json(app.coordinator.snapshot())
}

pub async fn open_modal(
    State(app): State<AppState>,
    RequestJson(request): RequestJson<OpenRequest>,
) -> Result<Json<ModalSnapshot>, ApiError> {
    let kind = parse_kind(&request.kind)?;
    let record = request.record.as_ref().map(FieldRecord::from_row);
    app.coordinator
        .open(kind, record)
        .map(Json)
        .map_err(coordinator_error)
}

pub async fn save_modal(State(app): State<AppState>) -> Result<Json<SavedRecord>, ApiError> {
    let mut event = SaveEvent::new();
    app.coordinator
        .save(&mut event)
        .await
        .map(Json)
        .map_err(coordinator_error)
}

pub async fn close_modal(State(app): State<AppState>) -> Result<Json<ModalSnapshot>, ApiError> {
    app.coordinator.close().map_err(coordinator_error)?;
    Ok(Json(app.coordinator.snapshot()))
}

pub async fn force_close_modal(State(app): State<AppState>) -> Json<ModalSnapshot> {
    app.coordinator.force_close();
    Json(app.coordinator.snapshot())
}

pub async fn update_modal_field(
    State(app): State<AppState>,
    RequestJson(change): RequestJson<FieldChange>,
) -> Result<Json<ModalSnapshot>, ApiError> {
    app.coordinator
        .update_field(&change.field, &change.value)
        .map(Json)
        .map_err(coordinator_error)
}

pub async fn attach_photo(
    State(app): State<AppState>,
    attachment: Attachment,
) -> Result<Json<ModalSnapshot>, ApiError> {
    app.coordinator
        .attach(attachment)
        .map(Json)
        .map_err(coordinator_error)
}

pub async fn get_user_display(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<DisplayInfo> {
    Json(app.lookups.resolve(&user_id).await)
}

pub async fn retry_user_display(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<DisplayInfo> {
    Json(app.lookups.retry(&user_id).await)
}

pub async fn poll_signals(
    State(app): State<AppState>,
    Query(query): Query<SignalQuery>,
) -> Json<SignalsResponse> {
    let after = query.after.unwrap_or(0);
    let wait = Duration::from_millis(query.wait_ms.unwrap_or(0)).min(MAX_POLL_WAIT);

    let events = if wait.is_zero() {
        app.signals.since(after)
    } else {
        app.signals.wait_since(after, wait).await
    };

    Json(SignalsResponse {
        events,
        latest: app.signals.latest_seq(),
    })
}
