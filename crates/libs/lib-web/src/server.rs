//! # Server Setup
//!
//! Server initialization, route registration, and HTTP server startup.
//!
//! This module creates the Axum router, registers all routes, applies
//! middleware, and starts the HTTP server.

// region: --- Imports
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use lib_core::config::{core_config, init_config};
use lib_core::{create_pool, Config, DbPool};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::chat::{Notifier, PresenceRegistry, RoomHub};
use crate::handlers;
use crate::middleware::{log_requests, require_auth, stamp_req};
// endregion: --- Imports

// region: --- AppState
/// Application state shared across all routes.
///
/// The presence registry and the room hub are the chat core's two shared
/// structures; everything else reaches them through here (or through a
/// [`Notifier`], extracted below, for the room handlers).
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub presence: Arc<PresenceRegistry>,
    pub hub: Arc<RoomHub>,
}

impl axum::extract::FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<PresenceRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.presence.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<RoomHub> {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

/// Room handlers push membership notifications without importing the
/// connection logic: they extract a `Notifier` instead.
impl axum::extract::FromRef<AppState> for Notifier {
    fn from_ref(state: &AppState) -> Self {
        Notifier::new(state.presence.clone())
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Server configuration
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3001")
    pub bind_address: String,
    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,
    /// Database migrations path
    pub migrations_path: &'static str,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3001".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            migrations_path: "./migrations",
        }
    }
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Initialize and start the HTTP server.
///
/// # Errors
///
/// Returns an error if configuration loading, database connection,
/// migrations, or server binding fail.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(
                std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            )
        });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global tracing subscriber");

    info!("RELAY BACKEND STARTING");

    dotenvy::dotenv().ok();

    info!("Loading configuration...");
    init_config().map_err(|e| anyhow::anyhow!(e))?;
    let app_config = core_config().clone();

    // Ensure the data directory exists for a file-backed SQLite database.
    if let Some(db_path) = app_config.database_url.strip_prefix("sqlite:") {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created database directory: {:?}", parent);
            }
        }
    }

    info!("Connecting to database...");
    let pool = create_pool().await?;

    info!("Running database migrations from: {}", config.migrations_path);
    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(config.migrations_path)).await?;
    migrator.run(&pool).await?;
    info!("Migrations complete");

    let state = AppState {
        db: pool,
        config: app_config,
        presence: Arc::new(PresenceRegistry::new()),
        hub: Arc::new(RoomHub::new()),
    };

    let app = create_router(state, config.allowed_origins.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    info!("SERVER READY: http://{}", config.bind_address);
    log_server_info();

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the main application router with all routes.
fn create_router(state: AppState, allowed_origins: Vec<String>) -> Router {
    use axum::http::{HeaderValue, Method};

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    // Everything under /api/rooms requires a verified bearer token; the
    // gateway authenticates inside its own handler (query-param tokens).
    let protected = Router::new()
        .route(
            "/api/rooms",
            get(handlers::rooms::list_rooms).post(handlers::rooms::create_room),
        )
        .route("/api/rooms/search", get(handlers::rooms::search_users))
        .route(
            "/api/rooms/join-by-invite-code",
            post(handlers::rooms::join_by_invite),
        )
        .route(
            "/api/rooms/private/{target_user_id}",
            post(handlers::rooms::create_private),
        )
        .route("/api/rooms/{id}", get(handlers::rooms::get_room))
        .route("/api/rooms/{id}/messages", get(handlers::rooms::get_messages))
        .route("/api/rooms/{id}/add-user", post(handlers::rooms::add_user))
        .route_layer(axum::middleware::from_fn(require_auth));

    Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/ws/chat", get(handlers::websocket::chat_websocket))
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .with_state(state)
        // Request stamping (adds request ID) - must run first
        .layer(axum::middleware::from_fn(stamp_req))
        .layer(axum::middleware::from_fn(log_requests))
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                },
            ),
        )
        .layer(cors)
}

/// Log the route map at startup.
fn log_server_info() {
    info!("AUTH:");
    info!("   • POST /api/auth/register");
    info!("   • POST /api/auth/login");
    info!("ROOMS:");
    info!("   • GET  /api/rooms");
    info!("   • POST /api/rooms");
    info!("   • GET  /api/rooms/search?query={{username}}");
    info!("   • GET  /api/rooms/{{id}}");
    info!("   • GET  /api/rooms/{{id}}/messages");
    info!("   • POST /api/rooms/{{id}}/add-user");
    info!("   • POST /api/rooms/join-by-invite-code");
    info!("   • POST /api/rooms/private/{{target_user_id}}");
    info!("REAL-TIME:");
    info!("   • GET  /api/ws/chat?token={{bearer}}");
    info!("HEALTH:");
    info!("   • GET  /health");
}
// endregion: --- Server Setup
