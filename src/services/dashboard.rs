//! Dashboard service — persistence boundary and validated CRUD.
//!
//! DESIGN
//! ======
//! `DashboardRepo` is the only way dashboards reach storage. Every call is a
//! single all-or-nothing write or read; the layout travels as one JSONB
//! document. `create_dashboard` and `update_dashboard` run the dashboard
//! schema first, so invalid drafts never reach the repository.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::doc::{Dashboard, DashboardDraft, DashboardSummary, Layout};
use crate::schema::{ValidationErrors, Validated};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("dashboard not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::routes::ErrorCode for DashboardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_DASHBOARD_NOT_FOUND",
            Self::Invalid(_) => "E_VALIDATION",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Storage for dashboards. Implementations must make each call atomic.
#[async_trait]
pub trait DashboardRepo: Send + Sync {
    async fn create(&self, draft: &DashboardDraft) -> Result<Uuid, DashboardError>;
    async fn update(&self, id: Uuid, draft: &DashboardDraft) -> Result<(), DashboardError>;
    async fn get(&self, id: Uuid) -> Result<Dashboard, DashboardError>;
    /// Summaries, most recently updated first.
    async fn list(&self) -> Result<Vec<DashboardSummary>, DashboardError>;
    async fn delete(&self, id: Uuid) -> Result<(), DashboardError>;
}

// =============================================================================
// SERVICE
// =============================================================================

/// Validate and create a dashboard.
///
/// # Errors
///
/// Returns `Invalid` without touching storage if the draft fails the schema,
/// otherwise any repository error.
pub async fn create_dashboard(repo: &dyn DashboardRepo, draft: &DashboardDraft) -> Result<Uuid, DashboardError> {
    draft.validate()?;
    let id = repo.create(draft).await?;
    info!(%id, components = draft.layout.components.len(), "dashboard created");
    Ok(id)
}

/// Validate and overwrite a dashboard.
///
/// # Errors
///
/// Returns `Invalid` without touching storage if the draft fails the schema,
/// otherwise any repository error.
pub async fn update_dashboard(repo: &dyn DashboardRepo, id: Uuid, draft: &DashboardDraft) -> Result<(), DashboardError> {
    draft.validate()?;
    repo.update(id, draft).await?;
    info!(%id, components = draft.layout.components.len(), "dashboard updated");
    Ok(())
}

/// Delete a dashboard.
///
/// # Errors
///
/// Returns `NotFound` if no dashboard has that id.
pub async fn delete_dashboard(repo: &dyn DashboardRepo, id: Uuid) -> Result<(), DashboardError> {
    repo.delete(id).await?;
    info!(%id, "dashboard deleted");
    Ok(())
}

// =============================================================================
// POSTGRES
// =============================================================================

type DashboardTuple = (Uuid, String, String, bool, Json<Layout>, OffsetDateTime, OffsetDateTime);

#[derive(Clone)]
pub struct PgDashboardRepo {
    pool: PgPool,
}

impl PgDashboardRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DashboardRepo for PgDashboardRepo {
    async fn create(&self, draft: &DashboardDraft) -> Result<Uuid, DashboardError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO dashboards (id, title, description, is_public, layout) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.is_public)
        .bind(Json(&draft.layout))
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, draft: &DashboardDraft) -> Result<(), DashboardError> {
        let result = sqlx::query(
            "UPDATE dashboards \
             SET title = $2, description = $3, is_public = $4, layout = $5, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.is_public)
        .bind(Json(&draft.layout))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DashboardError::NotFound(id));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Dashboard, DashboardError> {
        let row = sqlx::query_as::<_, DashboardTuple>(
            "SELECT id, title, description, is_public, layout, created_at, updated_at \
             FROM dashboards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DashboardError::NotFound(id))?;

        let (id, title, description, is_public, Json(layout), created_at, updated_at) = row;
        Ok(Dashboard { id, title, description, is_public, layout, created_at, updated_at })
    }

    async fn list(&self) -> Result<Vec<DashboardSummary>, DashboardError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, bool, i32, OffsetDateTime)>(
            "SELECT id, title, description, is_public, \
                    COALESCE(jsonb_array_length(layout -> 'components'), 0) AS component_count, \
                    updated_at \
             FROM dashboards \
             ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title, description, is_public, count, updated_at)| DashboardSummary {
                id,
                title,
                description,
                is_public,
                component_count: usize::try_from(count).unwrap_or(0),
                updated_at,
            })
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DashboardError> {
        let result = sqlx::query("DELETE FROM dashboards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DashboardError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
