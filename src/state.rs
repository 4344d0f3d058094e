//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! carries the collaborators every service needs (dashboard repository, data
//! source for renderers, notifier) plus the map of open editor sessions.
//! Services receive these explicitly; nothing is reached through globals.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::render::data::DataSource;
use crate::services::dashboard::DashboardRepo;
use crate::services::notify::Notifier;
use crate::services::session::EditorSession;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn DashboardRepo>,
    pub data: Arc<dyn DataSource>,
    pub notifier: Arc<dyn Notifier>,
    /// Open editor sessions keyed by session id.
    pub sessions: Arc<RwLock<HashMap<Uuid, EditorSession>>>,
    pub session_limit: usize,
    /// Sessions untouched for this long are evicted.
    pub session_idle: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(
        repo: Arc<dyn DashboardRepo>,
        data: Arc<dyn DataSource>,
        notifier: Arc<dyn Notifier>,
        session_limit: usize,
        session_idle: Duration,
    ) -> Self {
        Self {
            repo,
            data,
            notifier,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_limit,
            session_idle,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
