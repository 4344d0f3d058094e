use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::doc::Layout;
use crate::services::notify::NoticeLevel;
use crate::state::test_helpers::{self, FailingRepo, MemoryRepo, RecordingNotifier, SlowRepo, TEST_SESSION_LIMIT};

fn as_map(value: serde_json::Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object")
}

// =============================================================
// EditorSession (owned)
// =============================================================

#[test]
fn begin_save_with_blank_title_does_not_set_saving() {
    let mut session = EditorSession::new();
    session.store.add(ComponentKind::Chart);
    assert!(matches!(session.begin_save(), Err(SessionError::Invalid(_))));
    assert!(!session.is_saving());
    assert_eq!(session.store.len(), 1);
}

#[test]
fn finish_save_records_the_new_id_only_on_success() {
    let mut session = EditorSession::new();
    session.title = "Board report".into();

    session.begin_save().unwrap();
    session.finish_save(&Err(DashboardError::Database(sqlx::Error::PoolTimedOut)));
    assert!(session.dashboard_id.is_none());

    let id = Uuid::new_v4();
    session.begin_save().unwrap();
    session.finish_save(&Ok(id));
    assert_eq!(session.dashboard_id, Some(id));
    assert!(!session.is_saving());
}

#[test]
fn begin_save_twice_is_rejected_and_blocks_edits() {
    let mut session = EditorSession::new();
    session.title = "x".into();
    session.begin_save().unwrap();
    assert!(session.is_saving());
    assert!(matches!(session.begin_save(), Err(SessionError::SaveInFlight)));
    assert!(matches!(session.ensure_editable(), Err(SessionError::SaveInFlight)));

    session.finish_save(&Err(DashboardError::NotFound(Uuid::nil())));
    assert!(session.ensure_editable().is_ok());
}

// =============================================================
// Registry
// =============================================================

#[tokio::test]
async fn open_new_session_is_empty() {
    let (state, _, _) = test_helpers::test_app_state();
    let snap = open_session(&state, None).await.unwrap();
    assert!(snap.components.is_empty());
    assert!(snap.dashboard_id.is_none());
    assert!(snap.selected.is_none());
    assert_eq!(state.sessions.read().await.len(), 1);
}

#[tokio::test]
async fn open_existing_loads_stored_layout() {
    let (state, repo, _) = test_helpers::test_app_state();
    let mut store = crate::layout::LayoutStore::new();
    store.add(ComponentKind::Chart);
    let layout = store.to_layout();
    let id = test_helpers::seed_dashboard(
        &repo,
        DashboardDraft { title: "Stored".into(), layout: layout.clone(), ..DashboardDraft::default() },
    )
    .await;

    let snap = open_session(&state, Some(id)).await.unwrap();
    assert_eq!(snap.dashboard_id, Some(id));
    assert_eq!(snap.title, "Stored");
    assert_eq!(Layout { components: snap.components }, layout);
    assert_eq!(snap.tiles.len(), 1);
}

#[tokio::test]
async fn open_unknown_dashboard_fails() {
    let (state, _, _) = test_helpers::test_app_state();
    let err = open_session(&state, Some(Uuid::new_v4())).await.unwrap_err();
    assert!(matches!(err, SessionError::Dashboard(DashboardError::NotFound(_))));
    assert!(state.sessions.read().await.is_empty());
}

#[tokio::test]
async fn session_limit_is_enforced() {
    let (state, _, _) = test_helpers::test_app_state();
    for _ in 0..TEST_SESSION_LIMIT {
        open_session(&state, None).await.unwrap();
    }
    assert!(matches!(open_session(&state, None).await, Err(SessionError::TooManySessions(_))));
}

#[tokio::test]
async fn editing_flow_through_registry() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;

    let chart = add_component(&state, sid, ComponentKind::Chart).await.unwrap();
    let text = add_component(&state, sid, ComponentKind::Text).await.unwrap();

    let edited = edit_fields(&state, sid, &chart.id, &as_map(json!({"chartType": "pie"}))).await.unwrap();
    assert_eq!(
        serde_json::to_value(&edited).unwrap()["config"],
        json!({"chartType": "pie", "dataSource": "organizations", "aggregation": "count"})
    );

    assert!(move_component(&state, sid, &text.id, Direction::Up).await.unwrap());
    assert!(!move_component(&state, sid, &text.id, Direction::Up).await.unwrap());

    let renamed = update_component(&state, sid, &chart.id, Some("Orgs by status".into()), None).await.unwrap();
    assert_eq!(renamed.title, "Orgs by status");

    let snap = snapshot(&state, sid).await.unwrap();
    let order: Vec<&str> = snap.components.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, vec![text.id.as_str(), chart.id.as_str()]);
    assert_eq!(snap.selected.as_deref(), Some(text.id.as_str()));
    assert_eq!(snap.tiles.len(), 2);
}

#[tokio::test]
async fn delete_selected_component_clears_selection() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    let a = add_component(&state, sid, ComponentKind::Metric).await.unwrap();
    let b = add_component(&state, sid, ComponentKind::Metric).await.unwrap();

    delete_component(&state, sid, &a.id).await.unwrap();
    assert_eq!(snapshot(&state, sid).await.unwrap().selected.as_deref(), Some(b.id.as_str()));

    delete_component(&state, sid, &b.id).await.unwrap();
    assert!(snapshot(&state, sid).await.unwrap().selected.is_none());

    assert!(matches!(delete_component(&state, sid, &b.id).await, Err(SessionError::ComponentNotFound(_))));
}

#[tokio::test]
async fn select_and_clear() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    let a = add_component(&state, sid, ComponentKind::Text).await.unwrap();
    add_component(&state, sid, ComponentKind::Text).await.unwrap();

    select(&state, sid, Some(&a.id)).await.unwrap();
    assert_eq!(snapshot(&state, sid).await.unwrap().selected.as_deref(), Some(a.id.as_str()));
    assert!(matches!(select(&state, sid, Some("ghost")).await, Err(SessionError::ComponentNotFound(_))));
    select(&state, sid, None).await.unwrap();
    assert!(snapshot(&state, sid).await.unwrap().selected.is_none());
}

#[tokio::test]
async fn component_fields_follow_kind() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    let text = add_component(&state, sid, ComponentKind::Text).await.unwrap();
    let fields = component_fields(&state, sid, &text.id).await.unwrap();
    let keys: Vec<&str> = fields.iter().map(|f| f.key).collect();
    assert_eq!(keys, vec!["title", "content"]);
}

#[tokio::test]
async fn save_session_closes_on_success() {
    let (state, repo, notifier) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    add_component(&state, sid, ComponentKind::Chart).await.unwrap();
    update_meta(&state, sid, MetaPatch { title: Some("Saved".into()), ..MetaPatch::default() }).await.unwrap();

    let id = save_session(&state, sid).await.unwrap();
    assert!(state.sessions.read().await.get(&sid).is_none());
    assert_eq!(repo.stored(id).unwrap().title, "Saved");
    assert_eq!(notifier.take()[0].level, NoticeLevel::Success);
}

#[tokio::test]
async fn save_session_with_empty_title_keeps_session() {
    let (state, repo, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    add_component(&state, sid, ComponentKind::Chart).await.unwrap();

    assert!(matches!(save_session(&state, sid).await, Err(SessionError::Invalid(_))));
    assert_eq!(repo.call_count(), 0);
    let snap = snapshot(&state, sid).await.unwrap();
    assert_eq!(snap.components.len(), 1);
    assert!(!snap.saving);
}

#[tokio::test]
async fn save_session_failure_keeps_session_and_edits() {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = test_helpers::test_app_state_with(Arc::new(FailingRepo::default()), notifier.clone());
    let sid = open_session(&state, None).await.unwrap().session_id;
    add_component(&state, sid, ComponentKind::Table).await.unwrap();
    update_meta(&state, sid, MetaPatch { title: Some("Doomed".into()), ..MetaPatch::default() }).await.unwrap();

    assert!(matches!(save_session(&state, sid).await, Err(SessionError::Dashboard(_))));

    let snap = snapshot(&state, sid).await.unwrap();
    assert_eq!(snap.title, "Doomed");
    assert_eq!(snap.components.len(), 1);
    assert!(!snap.saving);
    assert_eq!(notifier.take()[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn edits_and_saves_are_refused_while_saving() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    update_meta(&state, sid, MetaPatch { title: Some("x".into()), ..MetaPatch::default() }).await.unwrap();
    state.sessions.write().await.get_mut(&sid).unwrap().begin_save().unwrap();

    assert!(matches!(add_component(&state, sid, ComponentKind::Text).await, Err(SessionError::SaveInFlight)));
    assert!(matches!(save_session(&state, sid).await, Err(SessionError::SaveInFlight)));
}

#[tokio::test]
async fn first_save_creates_then_reopened_save_updates() {
    let (state, repo, notifier) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    add_component(&state, sid, ComponentKind::Metric).await.unwrap();
    update_meta(&state, sid, MetaPatch { title: Some("Board report".into()), ..MetaPatch::default() }).await.unwrap();
    let id = save_session(&state, sid).await.unwrap();

    let reopened = open_session(&state, Some(id)).await.unwrap().session_id;
    add_component(&state, reopened, ComponentKind::Text).await.unwrap();
    assert_eq!(save_session(&state, reopened).await.unwrap(), id);

    assert_eq!(repo.dashboards.lock().unwrap().len(), 1);
    assert_eq!(repo.stored(id).unwrap().layout.components.len(), 2);
    assert!(notifier.take().iter().all(|n| n.level == NoticeLevel::Success));
}

#[tokio::test]
async fn empty_component_update_is_rejected() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    let text = add_component(&state, sid, ComponentKind::Text).await.unwrap();
    let err = update_component(&state, sid, &text.id, None, None).await.unwrap_err();
    assert!(matches!(err, SessionError::Editor(EditorError::Empty)));
}

#[tokio::test]
async fn close_session_discards_it() {
    let (state, repo, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    close_session(&state, sid).await.unwrap();
    assert!(matches!(snapshot(&state, sid).await, Err(SessionError::NotFound(_))));
    assert!(matches!(close_session(&state, sid).await, Err(SessionError::NotFound(_))));
    assert_eq!(repo.call_count(), 0);
}

#[tokio::test]
async fn close_is_refused_while_saving() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    update_meta(&state, sid, MetaPatch { title: Some("x".into()), ..MetaPatch::default() }).await.unwrap();
    state.sessions.write().await.get_mut(&sid).unwrap().begin_save().unwrap();

    assert!(matches!(close_session(&state, sid).await, Err(SessionError::SaveInFlight)));
    assert!(state.sessions.read().await.contains_key(&sid));
}

// =============================================================
// Dropped save requests
// =============================================================

fn slow_state(inner: Arc<dyn DashboardRepo>) -> AppState {
    let slow = SlowRepo { inner, delay: Duration::from_millis(100) };
    test_helpers::test_app_state_with(Arc::new(slow), Arc::new(RecordingNotifier::default()))
}

#[tokio::test]
async fn aborted_save_request_still_stores_and_closes() {
    let repo = Arc::new(MemoryRepo::default());
    let state = slow_state(repo.clone());
    let sid = open_session(&state, None).await.unwrap().session_id;
    update_meta(&state, sid, MetaPatch { title: Some("Detached".into()), ..MetaPatch::default() }).await.unwrap();

    let request_state = state.clone();
    let request = tokio::spawn(async move { save_session(&request_state, sid).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    request.abort();
    assert!(request.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!state.sessions.read().await.contains_key(&sid));
    let stored: Vec<String> = repo.dashboards.lock().unwrap().values().map(|d| d.title.clone()).collect();
    assert_eq!(stored, vec!["Detached".to_owned()]);
}

#[tokio::test]
async fn aborted_failing_save_leaves_session_editable() {
    let state = slow_state(Arc::new(FailingRepo::default()));
    let sid = open_session(&state, None).await.unwrap().session_id;
    update_meta(&state, sid, MetaPatch { title: Some("Retry me".into()), ..MetaPatch::default() }).await.unwrap();

    let request_state = state.clone();
    let request = tokio::spawn(async move { save_session(&request_state, sid).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    request.abort();
    let _ = request.await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!snapshot(&state, sid).await.unwrap().saving);
    add_component(&state, sid, ComponentKind::Text).await.unwrap();
    assert!(matches!(save_session(&state, sid).await, Err(SessionError::Dashboard(_))));
}

// =============================================================
// Idle eviction
// =============================================================

#[tokio::test]
async fn open_at_cap_succeeds_once_idle_sessions_expire() {
    let state = test_helpers::test_app_state_idle(Duration::from_millis(20));
    for _ in 0..TEST_SESSION_LIMIT {
        open_session(&state, None).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sid = open_session(&state, None).await.unwrap().session_id;
    let sessions = state.sessions.read().await;
    assert_eq!(sessions.len(), 1);
    assert!(sessions.contains_key(&sid));
}

#[tokio::test]
async fn eviction_skips_fresh_and_saving_sessions() {
    let (state, _, _) = test_helpers::test_app_state();
    let stale = open_session(&state, None).await.unwrap().session_id;
    let saving = open_session(&state, None).await.unwrap().session_id;
    update_meta(&state, saving, MetaPatch { title: Some("x".into()), ..MetaPatch::default() }).await.unwrap();
    state.sessions.write().await.get_mut(&saving).unwrap().begin_save().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fresh = open_session(&state, None).await.unwrap().session_id;

    let mut sessions = state.sessions.write().await;
    assert_eq!(evict_idle(&mut sessions, Duration::from_millis(30)), 1);
    assert!(!sessions.contains_key(&stale));
    assert!(sessions.contains_key(&saving));
    assert!(sessions.contains_key(&fresh));
}

#[tokio::test]
async fn access_refreshes_idle_clock() {
    let (state, _, _) = test_helpers::test_app_state();
    let sid = open_session(&state, None).await.unwrap().session_id;
    tokio::time::sleep(Duration::from_millis(50)).await;
    snapshot(&state, sid).await.unwrap();

    let mut sessions = state.sessions.write().await;
    assert_eq!(evict_idle(&mut sessions, Duration::from_millis(40)), 0);
}
