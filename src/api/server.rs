//! HTTP API server

use axum::{
    http::HeaderMap,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::password;
use crate::auth::{access_gate, AccessGate, AccessPolicy, AuthSession, ServerCookies, TokenService};
use crate::config::Config;
use crate::error::Result;
use crate::store::{self, SharedStore};

use super::{admin, patient, routes};

/// Application state shared across handlers. Immutable once built.
pub struct AppState {
    pub config: Config,
    pub gate: Arc<AccessGate>,
    pub store: SharedStore,
    /// Verified against when a login names an unknown email
    dummy_hash: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build state from configuration. Fails when no signing secret is set.
    pub fn new(config: Config, store: SharedStore) -> Result<Self> {
        let tokens = TokenService::from_config(&config.auth)?;
        let policy = AccessPolicy::from_config(&config.auth);
        let dummy_hash = password::dummy_hash(config.auth.bcrypt_cost)?;
        Ok(Self {
            config,
            gate: Arc::new(AccessGate::new(policy, tokens)),
            store,
            dummy_hash,
        })
    }

    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }

    pub fn tokens(&self) -> &TokenService {
        self.gate.tokens()
    }

    /// Server-side auth cookie session over the request headers
    pub fn session(&self, headers: &HeaderMap) -> AuthSession<ServerCookies> {
        AuthSession::new(
            ServerCookies::from_headers(headers),
            self.config.auth.production,
            self.tokens().ttl(),
        )
    }
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    // Check the secret before touching the database
    TokenService::from_config(&config.auth)?;

    let store = store::open_store(&config.database).await?;
    let state = Arc::new(AppState::new(config, store)?);

    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let gate = Arc::clone(&state.gate);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        // API routes
        .route("/api/health", get(routes::health))
        .route("/api/auth/register", post(routes::register))
        .route("/api/auth/login", post(routes::login))
        .route("/api/auth/logout", post(routes::logout))
        .route("/unauthorized", get(routes::unauthorized))
        // Signed-in areas
        .route("/dashboard", get(patient::dashboard))
        .route(
            "/profile",
            get(patient::get_profile).put(patient::update_profile),
        )
        // Admin area
        .route("/admin/stats", get(admin::stats))
        .route("/admin/patients", get(admin::list_patients))
        .route("/admin/appointments", get(admin::list_appointments))
        .route("/admin/services", get(admin::list_services))
        // Middleware
        .layer(middleware::from_fn_with_state(gate, access_gate))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
