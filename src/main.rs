mod config;
mod db;
mod doc;
mod editor;
mod layout;
mod render;
mod routes;
mod schema;
mod services;
mod state;

use std::sync::Arc;

use render::data::StaticDataSource;
use services::dashboard::PgDashboardRepo;
use services::notify::TracingNotifier;
use services::session::spawn_session_reaper;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    let state = state::AppState::new(
        Arc::new(PgDashboardRepo::new(pool)),
        Arc::new(StaticDataSource::placeholder()),
        Arc::new(TracingNotifier),
        config.session_limit,
        config.session_idle,
    );
    let _reaper = spawn_session_reaper(state.clone());

    let app = routes::app(state);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, session_limit = config.session_limit, "dashboard builder listening");
    axum::serve(listener, app).await.expect("server failed");
}
