use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use confess_api::{AppState, AppStateInner, feed, moderation, policy::Policy, submissions, votes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confess=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("CONFESS_DB_PATH").unwrap_or_else(|_| "confess.db".into());
    let host = std::env::var("CONFESS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CONFESS_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let admin_id: i64 = std::env::var("CONFESS_ADMIN_ID")
        .context("CONFESS_ADMIN_ID must be set to the admin's numeric user id")?
        .parse()
        .context("CONFESS_ADMIN_ID must be a number")?;
    let require_author: bool = std::env::var("CONFESS_REQUIRE_AUTHOR")
        .unwrap_or_else(|_| "true".into())
        .parse()
        .context("CONFESS_REQUIRE_AUTHOR must be true or false")?;

    // Init database
    let db = confess_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        policy: Policy::new(admin_id, require_author),
    });

    // Routes
    let app = Router::new()
        .route(
            "/confessions",
            get(feed::list).post(submissions::submit),
        )
        .route("/confessions/eligibility", get(submissions::eligibility))
        .route("/confessions/{id}/votes", post(votes::cast))
        .route("/confessions/{id}/moderation", post(moderation::moderate))
        .route("/top", get(feed::top))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Confess server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
