use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::api::handlers::{self, AppState};
use crate::repository::MAX_UPLOAD_BYTES;

/// Headroom over the photo limit; oversized photos are refused by the
/// upload check
const ATTACHMENT_BODY_SLACK: usize = 64 * 1024;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Catalog listings and removal
        .route("/catalog/:kind", get(handlers::list_entities))
        .route("/catalog/:kind/:id", delete(handlers::delete_entity))
        // Registration modal
        .route("/modal", get(handlers::get_modal))
        .route("/modal/open", post(handlers::open_modal))
        .route("/modal/save", post(handlers::save_modal))
        .route("/modal/close", post(handlers::close_modal))
        .route("/modal/force-close", post(handlers::force_close_modal))
        .route("/modal/fields", post(handlers::update_modal_field))
        .route(
            "/modal/attachment",
            put(handlers::attach_photo).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + ATTACHMENT_BODY_SLACK)),
        )
        // Owner display names
        .route("/users/:id/display", get(handlers::get_user_display))
        .route("/users/:id/display/retry", post(handlers::retry_user_display))
        // UI signals (long-poll)
        .route("/signals", get(handlers::poll_signals))
}

/// Router with the browser front end served from `assets` for every
/// unmatched path
pub fn create_router_with_assets(assets: Option<&str>) -> Router<AppState> {
    match assets {
        Some(dir) => create_router().fallback_service(ServeDir::new(dir)),
        None => create_router(),
    }
}
