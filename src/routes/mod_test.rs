use super::*;
use uuid::Uuid;

use crate::editor::EditorError;
use crate::schema::Validated;
use crate::state::test_helpers;

#[test]
fn dashboard_error_status_maps_not_found() {
    let err = DashboardError::NotFound(Uuid::nil());
    assert_eq!(dashboard_error_status(&err), StatusCode::NOT_FOUND);
}

#[test]
fn dashboard_error_status_maps_database() {
    let err = DashboardError::Database(sqlx::Error::PoolTimedOut);
    assert_eq!(dashboard_error_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn session_error_status_maps_each_variant() {
    assert_eq!(session_error_status(&SessionError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(session_error_status(&SessionError::ComponentNotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(session_error_status(&SessionError::TooManySessions(1)), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(session_error_status(&SessionError::SaveInFlight), StatusCode::CONFLICT);
    assert_eq!(session_error_status(&SessionError::Editor(EditorError::Empty)), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        session_error_status(&SessionError::Dashboard(DashboardError::Database(sqlx::Error::PoolTimedOut))),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        session_error_status(&SessionError::Dashboard(DashboardError::NotFound(Uuid::nil()))),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn failed_save_task_is_internal() {
    let task = tokio::spawn(std::future::pending::<()>());
    task.abort();
    let join_err = task.await.unwrap_err();
    let api = ApiError::from(SessionError::SaveTask(join_err));
    assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(api.code, "E_SAVE_TASK");
}

#[test]
fn validation_failure_keeps_its_code() {
    let invalid = crate::doc::DashboardDraft::default().validate().unwrap_err();
    let api = ApiError::from(SessionError::Invalid(invalid));
    assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(api.code, "E_VALIDATION");
    assert!(api.message.contains("title"));
}

#[tokio::test]
async fn error_response_carries_code_and_message() {
    let response = ApiError::from(SessionError::SaveInFlight).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "E_SAVE_IN_FLIGHT");
    assert_eq!(body["message"], "a save is already in progress");
    assert_eq!(body["retryable"], true);
}

#[test]
fn failed_write_is_retryable_but_not_found_is_not() {
    let write = ApiError::from(SessionError::Dashboard(DashboardError::Database(sqlx::Error::PoolTimedOut)));
    assert!(write.retryable);
    let missing = ApiError::from(DashboardError::NotFound(Uuid::nil()));
    assert!(!missing.retryable);
}

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}

#[test]
fn router_builds_without_route_conflicts() {
    let (state, _, _) = test_helpers::test_app_state();
    let _router = app(state);
}
