//! Stored dashboard routes and the component palette.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::doc::{self, Dashboard, DashboardDraft, DashboardSummary, PaletteEntry};
use crate::render::{self, RenderedTile};
use crate::routes::ApiError;
use crate::services::dashboard;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RenderedDashboard {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tiles: Vec<RenderedTile>,
}

/// `GET /api/palette` — component types that can be added.
pub async fn palette() -> Json<&'static [PaletteEntry]> {
    Json(doc::palette())
}

/// `GET /api/dashboards` — summaries, most recently updated first.
pub async fn list_dashboards(State(state): State<AppState>) -> Result<Json<Vec<DashboardSummary>>, ApiError> {
    Ok(Json(state.repo.list().await?))
}

/// `POST /api/dashboards` — create from a full draft.
pub async fn create_dashboard(
    State(state): State<AppState>,
    Json(draft): Json<DashboardDraft>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = dashboard::create_dashboard(state.repo.as_ref(), &draft).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /api/dashboards/{id}`
pub async fn get_dashboard(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(state.repo.get(id).await?))
}

/// `PUT /api/dashboards/{id}` — overwrite metadata and layout.
pub async fn update_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<DashboardDraft>,
) -> Result<StatusCode, ApiError> {
    dashboard::update_dashboard(state.repo.as_ref(), id, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/dashboards/{id}`
pub async fn delete_dashboard(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    dashboard::delete_dashboard(state.repo.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/dashboards/{id}/render` — read-only rendered view.
pub async fn render_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RenderedDashboard>, ApiError> {
    let stored = state.repo.get(id).await?;
    let tiles = render::render_layout(&stored.layout, state.data.as_ref());
    Ok(Json(RenderedDashboard { id: stored.id, title: stored.title, description: stored.description, tiles }))
}

#[cfg(test)]
#[path = "dashboards_test.rs"]
mod tests;
