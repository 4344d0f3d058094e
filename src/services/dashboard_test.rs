use super::*;
use crate::doc::ComponentKind;
use crate::layout::LayoutStore;
use crate::state::test_helpers::{FailingRepo, MemoryRepo};

fn draft(title: &str) -> DashboardDraft {
    let mut store = LayoutStore::new();
    store.add(ComponentKind::Chart);
    store.add(ComponentKind::Metric);
    DashboardDraft { title: title.into(), description: "Quarterly".into(), is_public: true, layout: store.to_layout() }
}

#[tokio::test]
async fn create_then_get_returns_identical_layout() {
    let repo = MemoryRepo::default();
    let d = draft("Overview");
    let id = create_dashboard(&repo, &d).await.unwrap();

    let stored = repo.get(id).await.unwrap();
    assert_eq!(stored.title, "Overview");
    assert!(stored.is_public);
    assert_eq!(stored.layout, d.layout);
}

#[tokio::test]
async fn create_with_empty_title_makes_no_repository_call() {
    let repo = MemoryRepo::default();
    let err = create_dashboard(&repo, &draft("")).await.unwrap_err();
    assert!(matches!(err, DashboardError::Invalid(ref e) if e.errors.iter().any(|f| f.field == "title")));
    assert_eq!(repo.call_count(), 0);
}

#[tokio::test]
async fn update_with_invalid_draft_makes_no_repository_call() {
    let repo = MemoryRepo::default();
    let err = update_dashboard(&repo, Uuid::new_v4(), &draft("  ")).await.unwrap_err();
    assert!(matches!(err, DashboardError::Invalid(_)));
    assert_eq!(repo.call_count(), 0);
}

#[tokio::test]
async fn update_overwrites_all_fields() {
    let repo = MemoryRepo::default();
    let id = create_dashboard(&repo, &draft("Before")).await.unwrap();

    let after = DashboardDraft { title: "After".into(), ..DashboardDraft::default() };
    update_dashboard(&repo, id, &after).await.unwrap();

    let stored = repo.get(id).await.unwrap();
    assert_eq!(stored.title, "After");
    assert!(stored.layout.components.is_empty());
    assert!(!stored.is_public);
}

#[tokio::test]
async fn update_unknown_dashboard_is_not_found() {
    let repo = MemoryRepo::default();
    let err = update_dashboard(&repo, Uuid::nil(), &draft("x")).await.unwrap_err();
    assert!(matches!(err, DashboardError::NotFound(id) if id == Uuid::nil()));
}

#[tokio::test]
async fn delete_removes_and_second_delete_is_not_found() {
    let repo = MemoryRepo::default();
    let id = create_dashboard(&repo, &draft("Temp")).await.unwrap();
    delete_dashboard(&repo, id).await.unwrap();
    assert!(matches!(delete_dashboard(&repo, id).await, Err(DashboardError::NotFound(_))));
}

#[tokio::test]
async fn repository_failure_is_propagated() {
    let repo = FailingRepo::default();
    let err = create_dashboard(&repo, &draft("x")).await.unwrap_err();
    assert!(matches!(err, DashboardError::Database(_)));
}

#[test]
fn error_codes_are_stable() {
    use crate::routes::ErrorCode;
    assert_eq!(DashboardError::NotFound(Uuid::nil()).error_code(), "E_DASHBOARD_NOT_FOUND");
    assert_eq!(DashboardError::Database(sqlx::Error::PoolTimedOut).error_code(), "E_DATABASE");
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn live_repo() -> PgDashboardRepo {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required for live-db-tests");
        let pool = PgPoolOptions::new().connect(&url).await.expect("connect");
        sqlx::migrate!("src/db/migrations").run(&pool).await.expect("migrate");
        PgDashboardRepo::new(pool)
    }

    #[tokio::test]
    async fn postgres_round_trip() {
        let repo = live_repo().await;
        let d = draft("Live");
        let id = create_dashboard(&repo, &d).await.unwrap();
        assert_eq!(repo.get(id).await.unwrap().layout, d.layout);
        assert!(repo.list().await.unwrap().iter().any(|s| s.id == id && s.component_count == 2));
        delete_dashboard(&repo, id).await.unwrap();
    }
}
