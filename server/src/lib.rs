//! # SNBT Results API
//!
//! Read-only REST API over a fixed SQLite dump of national university
//! admission (SNBT) results.
//!
//! ## Endpoints
//!
//! - `GET /` — liveness text
//! - `GET /universities?page&pageSize&name` — paginated university
//!   aggregates, enriched per page via Wikidata + Hipolabs
//! - `GET /universities/:ptn_code` — one university, enriched
//! - `GET /universities/:ptn_code/programs` — program aggregates
//! - `GET /universities/:ptn_code/programs/:program_code/passers` —
//!   paginated passing students
//! - `GET /stats` — dump-wide totals
//! - `GET /students?q=` — free-text student search
//!
//! ## Infrastructure
//!
//! - SQLite holds the dump; every query is read-only aggregation.
//! - Redis memoizes both the external enrichment lookups and the heavier
//!   response payloads. If Redis is down everything still works, only
//!   slower.
//! - External lookups live in the `enrich` crate and can never fail a
//!   request.

use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::{
    net::TcpListener,
    signal::{
        ctrl_c,
        unix::{signal, SignalKind},
    },
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

use routes::{
    passers_handler, programs_handler, root_handler, stats_handler, students_handler,
    universities_handler, university_handler,
};
use state::State;

pub fn router(state: Arc<State>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/universities", get(universities_handler))
        .route("/universities/:ptn_code", get(university_handler))
        .route("/universities/:ptn_code/programs", get(programs_handler))
        .route(
            "/universities/:ptn_code/programs/:program_code/passers",
            get(passers_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/students", get(students_handler))
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
