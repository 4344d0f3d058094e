//! Router assembly and the JSON error envelope.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST endpoints for stored dashboards and for open
//! editor sessions under a single Axum router. Handlers translate HTTP to
//! service calls; every service error carries a grepable `E_*` code that is
//! returned to clients alongside its message.

pub mod dashboards;
pub mod sessions;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::dashboard::DashboardError;
use crate::services::session::SessionError;
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code and retryable flag for JSON error bodies.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    retryable: bool,
}

/// Error response: HTTP status plus `{code, message, retryable}` JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    fn new<E: ErrorCode>(status: StatusCode, err: &E) -> Self {
        Self { status, code: err.error_code(), message: err.to_string(), retryable: err.retryable() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody { code: self.code, message: self.message, retryable: self.retryable };
        (self.status, Json(body)).into_response()
    }
}

pub(crate) fn dashboard_error_status(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn session_error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotFound(_) | SessionError::ComponentNotFound(_) => StatusCode::NOT_FOUND,
        SessionError::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::SaveInFlight => StatusCode::CONFLICT,
        SessionError::SaveTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Invalid(_) | SessionError::Layout(_) | SessionError::Editor(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Dashboard(e) => match e {
            // The remote write failed; the editor keeps its state.
            DashboardError::Database(_) => StatusCode::BAD_GATEWAY,
            other => dashboard_error_status(other),
        },
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        Self::new(dashboard_error_status(&err), &err)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::new(session_error_status(&err), &err)
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// API router with CORS, compression and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/palette", get(dashboards::palette))
        .route("/api/dashboards", get(dashboards::list_dashboards).post(dashboards::create_dashboard))
        .route(
            "/api/dashboards/{id}",
            get(dashboards::get_dashboard)
                .put(dashboards::update_dashboard)
                .delete(dashboards::delete_dashboard),
        )
        .route("/api/dashboards/{id}/render", get(dashboards::render_dashboard))
        .route("/api/sessions", post(sessions::open_session))
        .route(
            "/api/sessions/{sid}",
            get(sessions::get_session)
                .patch(sessions::update_meta)
                .delete(sessions::close_session),
        )
        .route("/api/sessions/{sid}/save", post(sessions::save_session))
        .route("/api/sessions/{sid}/selection", axum::routing::put(sessions::select))
        .route("/api/sessions/{sid}/components", post(sessions::add_component))
        .route(
            "/api/sessions/{sid}/components/{cid}",
            axum::routing::patch(sessions::update_component).delete(sessions::delete_component),
        )
        .route("/api/sessions/{sid}/components/{cid}/move", post(sessions::move_component))
        .route(
            "/api/sessions/{sid}/components/{cid}/fields",
            get(sessions::component_fields).post(sessions::edit_fields),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
