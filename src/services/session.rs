//! Editor session service — one open dashboard editor per session id.
//!
//! DESIGN
//! ======
//! An `EditorSession` owns the in-memory component list, selection and
//! dashboard metadata of one editor. Sessions live in `AppState` and every
//! edit runs synchronously under the session map lock, so no two edits of a
//! session interleave.
//!
//! SAVE
//! ====
//! Save is the only remote write. The draft is validated and snapshotted
//! under the lock, the session is flagged as saving, and the lock is released
//! before the repository call. While the flag is set a second save, any edit
//! and a close are refused. On success the session closes; on failure the
//! flag is cleared and every edit is still there for the user to retry. The
//! write and its bookkeeping run in a spawned task, so the flag is cleared
//! even when the request that started the save is dropped.
//!
//! IDLE SESSIONS
//! =============
//! Every access refreshes a session's `last_touched`. Sessions idle for longer
//! than `AppState::session_idle` are evicted by a periodic reaper and before
//! the limit check on open. A session that is saving is never evicted.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::doc::{ComponentKind, Dashboard, DashboardComponent, DashboardDraft, Position};
use crate::editor::{self, EditorError, FieldSpec};
use crate::layout::{ComponentPatch, Direction, LayoutError, LayoutStore};
use crate::render::{self, RenderedTile};
use crate::routes::ErrorCode;
use crate::schema::{ValidationErrors, Validated};
use crate::services::dashboard::{self, DashboardError, DashboardRepo};
use crate::services::notify::{Notice, Notifier};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error("component not found: {0}")]
    ComponentNotFound(String),
    #[error("too many open sessions (limit {0})")]
    TooManySessions(usize),
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("save task failed: {0}")]
    SaveTask(#[from] JoinError),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::ComponentNotFound(_) => "E_COMPONENT_NOT_FOUND",
            Self::TooManySessions(_) => "E_TOO_MANY_SESSIONS",
            Self::SaveInFlight => "E_SAVE_IN_FLIGHT",
            Self::Invalid(e) => e.error_code(),
            Self::Layout(e) => e.error_code(),
            Self::Editor(e) => e.error_code(),
            Self::Dashboard(e) => e.error_code(),
            Self::SaveTask(_) => "E_SAVE_TASK",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::SaveInFlight => true,
            Self::Dashboard(e) => e.retryable(),
            _ => false,
        }
    }
}

/// Sparse update of dashboard metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// Read view of a session as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub dashboard_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub selected: Option<String>,
    pub saving: bool,
    pub components: Vec<DashboardComponent>,
    pub tiles: Vec<RenderedTile>,
}

// =============================================================================
// EDITOR SESSION
// =============================================================================

#[derive(Debug, Clone)]
pub struct EditorSession {
    pub dashboard_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub store: LayoutStore,
    saving: bool,
    last_touched: Instant,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// Editor for a dashboard that does not exist yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dashboard_id: None,
            title: String::new(),
            description: String::new(),
            is_public: false,
            store: LayoutStore::new(),
            saving: false,
            last_touched: Instant::now(),
        }
    }

    /// Editor for an existing dashboard.
    #[must_use]
    pub fn from_dashboard(dashboard: Dashboard) -> Self {
        Self {
            dashboard_id: Some(dashboard.id),
            title: dashboard.title,
            description: dashboard.description,
            is_public: dashboard.is_public,
            store: LayoutStore::from_layout(dashboard.layout),
            saving: false,
            last_touched: Instant::now(),
        }
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    /// Idle for at least `idle` and not saving.
    fn is_expired(&self, idle: Duration) -> bool {
        !self.saving && self.last_touched.elapsed() >= idle
    }

    #[must_use]
    pub fn draft(&self) -> DashboardDraft {
        DashboardDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            is_public: self.is_public,
            layout: self.store.to_layout(),
        }
    }

    /// # Errors
    ///
    /// Returns `SaveInFlight` while a save is running.
    pub fn ensure_editable(&self) -> Result<(), SessionError> {
        if self.saving { Err(SessionError::SaveInFlight) } else { Ok(()) }
    }

    pub fn apply_meta(&mut self, patch: MetaPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
    }

    /// Validate and snapshot the draft, then mark the session as saving.
    ///
    /// # Errors
    ///
    /// Returns `SaveInFlight` if a save is already running and `Invalid` if
    /// the draft fails validation. Neither sets the saving flag.
    pub fn begin_save(&mut self) -> Result<DashboardDraft, SessionError> {
        self.ensure_editable()?;
        let draft = self.draft();
        draft.validate()?;
        self.saving = true;
        Ok(draft)
    }

    /// Clear the saving flag and record the id on success.
    pub fn finish_save(&mut self, result: &Result<Uuid, DashboardError>) {
        self.saving = false;
        if let Ok(id) = result {
            self.dashboard_id = Some(*id);
        }
    }

    fn component(&self, component_id: &str) -> Result<&DashboardComponent, SessionError> {
        self.store
            .get(component_id)
            .ok_or_else(|| SessionError::ComponentNotFound(component_id.to_owned()))
    }

    fn snapshot(&self, session_id: Uuid, state: &AppState) -> SessionSnapshot {
        SessionSnapshot {
            session_id,
            dashboard_id: self.dashboard_id,
            title: self.title.clone(),
            description: self.description.clone(),
            is_public: self.is_public,
            selected: self.store.selected_id().map(str::to_owned),
            saving: self.is_saving(),
            components: self.store.components().to_vec(),
            tiles: render::render_components(self.store.components(), state.data.as_ref()),
        }
    }
}

async fn persist(repo: &dyn DashboardRepo, id: Option<Uuid>, draft: &DashboardDraft) -> Result<Uuid, DashboardError> {
    match id {
        Some(id) => dashboard::update_dashboard(repo, id, draft).await.map(|()| id),
        None => dashboard::create_dashboard(repo, draft).await,
    }
}

fn notify_rejected(notifier: &dyn Notifier, err: &SessionError) {
    if let SessionError::Invalid(e) = err {
        notifier.notify(Notice::error("Cannot save dashboard", e.to_string()));
    }
}

fn notify_result(notifier: &dyn Notifier, draft: &DashboardDraft, result: &Result<Uuid, DashboardError>) {
    match result {
        Ok(_) => notifier.notify(Notice::success("Dashboard saved", format!("\"{}\" was saved", draft.title))),
        Err(e) => notifier.notify(Notice::error("Failed to save dashboard", e.to_string())),
    }
}

// =============================================================================
// SESSION REGISTRY
// =============================================================================

/// Open an editor, loading `dashboard_id` if given.
///
/// # Errors
///
/// Returns the repository error if the dashboard cannot be loaded and
/// `TooManySessions` when the session limit is reached.
pub async fn open_session(state: &AppState, dashboard_id: Option<Uuid>) -> Result<SessionSnapshot, SessionError> {
    // Load outside the lock; the session does not exist yet.
    let session = match dashboard_id {
        Some(id) => EditorSession::from_dashboard(state.repo.get(id).await?),
        None => EditorSession::new(),
    };

    let mut sessions = state.sessions.write().await;
    if sessions.len() >= state.session_limit {
        evict_idle(&mut sessions, state.session_idle);
    }
    if sessions.len() >= state.session_limit {
        return Err(SessionError::TooManySessions(state.session_limit));
    }
    let session_id = Uuid::new_v4();
    let snapshot = session.snapshot(session_id, state);
    let components = session.store.len();
    sessions.insert(session_id, session);

    info!(%session_id, dashboard_id = ?dashboard_id, components, open = sessions.len(), "editor session opened");
    Ok(snapshot)
}

/// Discard a session without saving.
///
/// # Errors
///
/// Returns `NotFound` for an unknown session and `SaveInFlight` while it is
/// saving.
pub async fn close_session(state: &AppState, session_id: Uuid) -> Result<(), SessionError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get(&session_id).ok_or(SessionError::NotFound(session_id))?;
    session.ensure_editable()?;
    sessions.remove(&session_id);
    info!(%session_id, "editor session closed");
    Ok(())
}

/// Drop sessions idle for at least `idle`. Returns how many were removed.
fn evict_idle(sessions: &mut HashMap<Uuid, EditorSession>, idle: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_expired(idle));
    let evicted = before - sessions.len();
    if evicted > 0 {
        info!(evicted, open = sessions.len(), "idle editor sessions evicted");
    }
    evicted
}

/// Periodically evict idle editor sessions.
pub fn spawn_session_reaper(state: AppState) -> JoinHandle<()> {
    let period = (state.session_idle / 2).max(Duration::from_secs(1));
    info!(idle_secs = state.session_idle.as_secs(), "editor session reaper configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            evict_idle(&mut *state.sessions.write().await, state.session_idle);
        }
    })
}

/// # Errors
///
/// Returns `NotFound` for an unknown session.
pub async fn snapshot(state: &AppState, session_id: Uuid) -> Result<SessionSnapshot, SessionError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
    session.touch();
    Ok(session.snapshot(session_id, state))
}

/// Run an edit against a session that is not saving.
async fn edit<T>(
    state: &AppState,
    session_id: Uuid,
    f: impl FnOnce(&mut EditorSession) -> Result<T, SessionError>,
) -> Result<T, SessionError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
    session.ensure_editable()?;
    session.touch();
    f(session)
}

/// # Errors
///
/// Returns `NotFound` or `SaveInFlight`.
pub async fn update_meta(state: &AppState, session_id: Uuid, patch: MetaPatch) -> Result<SessionSnapshot, SessionError> {
    edit(state, session_id, |session| {
        session.apply_meta(patch);
        Ok(session.snapshot(session_id, state))
    })
    .await
}

/// Add a component of `kind`; it becomes the selection.
///
/// # Errors
///
/// Returns `NotFound` or `SaveInFlight`.
pub async fn add_component(state: &AppState, session_id: Uuid, kind: ComponentKind) -> Result<DashboardComponent, SessionError> {
    edit(state, session_id, |session| Ok(session.store.add(kind).clone())).await
}

/// Apply title and position changes to a component.
///
/// # Errors
///
/// Returns `ComponentNotFound` for an unknown component.
pub async fn update_component(
    state: &AppState,
    session_id: Uuid,
    component_id: &str,
    title: Option<String>,
    position: Option<Position>,
) -> Result<DashboardComponent, SessionError> {
    edit(state, session_id, |session| {
        let patch = ComponentPatch { title, body: None, position };
        if patch.is_empty() {
            return Err(EditorError::Empty.into());
        }
        if !session.store.update(component_id, patch)? {
            return Err(SessionError::ComponentNotFound(component_id.to_owned()));
        }
        Ok(session.component(component_id)?.clone())
    })
    .await
}

/// Property-editor form for a component.
///
/// # Errors
///
/// Returns `NotFound` or `ComponentNotFound`.
pub async fn component_fields(state: &AppState, session_id: Uuid, component_id: &str) -> Result<Vec<FieldSpec>, SessionError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
    session.touch();
    Ok(editor::fields_for(session.component(component_id)?, state.data.as_ref()))
}

/// Apply property-editor changes to a component.
///
/// # Errors
///
/// Returns `ComponentNotFound`, or the editor error for rejected changes.
pub async fn edit_fields(
    state: &AppState,
    session_id: Uuid,
    component_id: &str,
    changes: &Map<String, Value>,
) -> Result<DashboardComponent, SessionError> {
    edit(state, session_id, |session| {
        let patch = editor::apply_edits(session.component(component_id)?, changes)?;
        session.store.update(component_id, patch)?;
        Ok(session.component(component_id)?.clone())
    })
    .await
}

/// # Errors
///
/// Returns `ComponentNotFound` for an unknown component.
pub async fn delete_component(state: &AppState, session_id: Uuid, component_id: &str) -> Result<(), SessionError> {
    edit(state, session_id, |session| {
        if session.store.delete(component_id) {
            Ok(())
        } else {
            Err(SessionError::ComponentNotFound(component_id.to_owned()))
        }
    })
    .await
}

/// Reorder a component. Returns whether the order changed; moving past
/// either end is a no-op.
///
/// # Errors
///
/// Returns `ComponentNotFound` for an unknown component.
pub async fn move_component(
    state: &AppState,
    session_id: Uuid,
    component_id: &str,
    direction: Direction,
) -> Result<bool, SessionError> {
    edit(state, session_id, |session| {
        session.component(component_id)?;
        Ok(session.store.move_component(component_id, direction))
    })
    .await
}

/// Select a component, or clear the selection with `None`.
///
/// # Errors
///
/// Returns `ComponentNotFound` when selecting an unknown component.
pub async fn select(state: &AppState, session_id: Uuid, component_id: Option<&str>) -> Result<(), SessionError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
    session.touch();
    match component_id {
        Some(id) if !session.store.select(id) => Err(SessionError::ComponentNotFound(id.to_owned())),
        Some(_) => Ok(()),
        None => {
            session.store.clear_selection();
            Ok(())
        }
    }
}

/// Save a session. The session closes on success and stays open, unchanged,
/// on failure.
///
/// # Errors
///
/// Returns `Invalid` (no remote call), `SaveInFlight`, or the repository
/// error of a failed write.
pub async fn save_session(state: &AppState, session_id: Uuid) -> Result<Uuid, SessionError> {
    let (draft, dashboard_id) = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&session_id).ok_or(SessionError::NotFound(session_id))?;
        match session.begin_save() {
            Ok(draft) => (draft, session.dashboard_id),
            Err(e) => {
                notify_rejected(state.notifier.as_ref(), &e);
                return Err(e);
            }
        }
    };

    // The write runs detached so the saving flag is settled even if this
    // request is dropped.
    let task_state = state.clone();
    tokio::spawn(async move { complete_save(&task_state, session_id, dashboard_id, draft).await }).await?
}

async fn complete_save(
    state: &AppState,
    session_id: Uuid,
    dashboard_id: Option<Uuid>,
    draft: DashboardDraft,
) -> Result<Uuid, SessionError> {
    let result = persist(state.repo.as_ref(), dashboard_id, &draft).await;
    notify_result(state.notifier.as_ref(), &draft, &result);

    let mut sessions = state.sessions.write().await;
    match &result {
        Ok(id) => {
            sessions.remove(&session_id);
            info!(%session_id, dashboard_id = %id, "dashboard saved; editor session closed");
        }
        Err(e) => {
            if let Some(session) = sessions.get_mut(&session_id) {
                session.finish_save(&result);
            }
            warn!(%session_id, error = %e, "dashboard save failed; editor session kept");
        }
    }
    result.map_err(Into::into)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
