//! Editor session routes.
//!
//! Every edit goes through `services::session`; handlers only decode bodies
//! and shape responses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::doc::{ComponentKind, DashboardComponent, Position};
use crate::editor::FieldSpec;
use crate::layout::Direction;
use crate::routes::ApiError;
use crate::services::session::{self, MetaPatch, SessionSnapshot};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionBody {
    pub dashboard_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddComponentBody {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateComponentBody {
    pub title: Option<String>,
    pub position: Option<Position>,
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct SelectBody {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub dashboard_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MovedResponse {
    pub moved: bool,
}

fn parse_kind(raw: &str) -> Result<ComponentKind, ApiError> {
    ComponentKind::parse(raw).ok_or_else(|| ApiError {
        status: StatusCode::BAD_REQUEST,
        code: "E_UNKNOWN_COMPONENT_TYPE",
        message: format!("unknown component type: {raw}"),
        retryable: false,
    })
}

/// `POST /api/sessions` — open an editor, optionally on a stored dashboard.
pub async fn open_session(
    State(state): State<AppState>,
    Json(body): Json<OpenSessionBody>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let snapshot = session::open_session(&state, body.dashboard_id).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /api/sessions/{sid}`
pub async fn get_session(State(state): State<AppState>, Path(sid): Path<Uuid>) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(session::snapshot(&state, sid).await?))
}

/// `PATCH /api/sessions/{sid}` — title, description, visibility.
pub async fn update_meta(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(patch): Json<MetaPatch>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(session::update_meta(&state, sid, patch).await?))
}

/// `DELETE /api/sessions/{sid}` — discard without saving.
pub async fn close_session(State(state): State<AppState>, Path(sid): Path<Uuid>) -> Result<StatusCode, ApiError> {
    session::close_session(&state, sid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/{sid}/save` — persist and close the editor.
pub async fn save_session(State(state): State<AppState>, Path(sid): Path<Uuid>) -> Result<Json<SavedResponse>, ApiError> {
    let dashboard_id = session::save_session(&state, sid).await?;
    Ok(Json(SavedResponse { dashboard_id }))
}

/// `PUT /api/sessions/{sid}/selection` — `{"id": null}` clears it.
pub async fn select(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(body): Json<SelectBody>,
) -> Result<StatusCode, ApiError> {
    session::select(&state, sid, body.id.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/{sid}/components` — add from the palette.
pub async fn add_component(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(body): Json<AddComponentBody>,
) -> Result<(StatusCode, Json<DashboardComponent>), ApiError> {
    let kind = parse_kind(&body.kind)?;
    let component = session::add_component(&state, sid, kind).await?;
    Ok((StatusCode::CREATED, Json(component)))
}

/// `PATCH /api/sessions/{sid}/components/{cid}` — title and position.
pub async fn update_component(
    State(state): State<AppState>,
    Path((sid, cid)): Path<(Uuid, String)>,
    Json(body): Json<UpdateComponentBody>,
) -> Result<Json<DashboardComponent>, ApiError> {
    Ok(Json(session::update_component(&state, sid, &cid, body.title, body.position).await?))
}

/// `DELETE /api/sessions/{sid}/components/{cid}`
pub async fn delete_component(
    State(state): State<AppState>,
    Path((sid, cid)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    session::delete_component(&state, sid, &cid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/{sid}/components/{cid}/move`
pub async fn move_component(
    State(state): State<AppState>,
    Path((sid, cid)): Path<(Uuid, String)>,
    Json(body): Json<MoveBody>,
) -> Result<Json<MovedResponse>, ApiError> {
    let moved = session::move_component(&state, sid, &cid, body.direction).await?;
    Ok(Json(MovedResponse { moved }))
}

/// `GET /api/sessions/{sid}/components/{cid}/fields` — property-editor form.
pub async fn component_fields(
    State(state): State<AppState>,
    Path((sid, cid)): Path<(Uuid, String)>,
) -> Result<Json<Vec<FieldSpec>>, ApiError> {
    Ok(Json(session::component_fields(&state, sid, &cid).await?))
}

/// `POST /api/sessions/{sid}/components/{cid}/fields` — apply form changes.
pub async fn edit_fields(
    State(state): State<AppState>,
    Path((sid, cid)): Path<(Uuid, String)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<DashboardComponent>, ApiError> {
    Ok(Json(session::edit_fields(&state, sid, &cid, &changes).await?))
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
