//! DOB Validator Backend Server
//!
//! HTTP server providing wallet-based challenge/response authentication for
//! Stellar wallets: one-time challenges, signature verification, bearer
//! tokens with server-side session revocation, and a periodic expiry sweep.

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use dob_validator_backend::auth::{AuthService, CleanupScheduler, StellarSignatureVerifier};
use dob_validator_backend::clock::SystemClock;
use dob_validator_backend::config::Config;
use dob_validator_backend::middleware::request_tracing;
use dob_validator_backend::routes;
use dob_validator_backend::state::AppState;
use dob_validator_backend::store::{
    ChallengeStore, InMemoryChallengeStore, InMemorySessionStore, InMemoryUserDirectory,
    PgChallengeStore, PgSessionStore, PgUserDirectory, SessionStore, UserDirectory,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    // Select store backends: Postgres when DATABASE_URL is set, otherwise
    // process-memory maps (single-instance deployments only)
    let (challenges, sessions, users): (
        Arc<dyn ChallengeStore>,
        Arc<dyn SessionStore>,
        Arc<dyn UserDirectory>,
    ) = match &config.database_url {
        Some(database_url) => {
            tracing::info!(
                url = %config.database_url_masked().unwrap_or_default(),
                "Connecting to database"
            );
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.store_timeout_seconds))
                .connect(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connected, using Postgres-backed stores");
            (
                Arc::new(PgChallengeStore::new(pool.clone())),
                Arc::new(PgSessionStore::new(pool.clone())),
                Arc::new(PgUserDirectory::new(pool)),
            )
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            (
                Arc::new(InMemoryChallengeStore::new()),
                Arc::new(InMemorySessionStore::new()),
                Arc::new(InMemoryUserDirectory::new()),
            )
        }
    };

    let clock = Arc::new(SystemClock);

    let auth_service = Arc::new(AuthService::new(
        challenges.clone(),
        sessions.clone(),
        users,
        Arc::new(StellarSignatureVerifier),
        clock.clone(),
        config.jwt_secret.clone(),
        config.challenge_ttl_seconds,
        config.session_ttl_days,
    ));

    // Start the expiry sweep in the background, stoppable on shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = CleanupScheduler::new(
        challenges,
        sessions,
        clock,
        Duration::from_secs(config.cleanup_interval_seconds),
    );
    let cleanup_handle = tokio::spawn(scheduler.run(shutdown_rx));

    let app_state = AppState::new(auth_service);

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(routes::auth_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(request_tracing))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Stop the sweep after the server drains
    let _ = shutdown_tx.send(true);
    let _ = cleanup_handle.await;

    tracing::info!("Server shutdown complete");
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
