//! HTTP API for the Brain Notes server.
//!
//! # Modules
//!
//! - [`auth`]: registration, email verification, login, refresh, logout, password reset
//! - [`profile`]: profile view and single-action profile updates
//! - [`notes`]: notes and folders of the signed-in user
//! - [`middleware`]: identity and activity gates for protected endpoints
//! - [`request_id`]: request IDs, access logging and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `POST /auth/register`, `GET /auth/verify?token=`, `POST /auth/resend-verification`
//! - `POST /auth/login`, `POST /auth/refresh`, `POST /auth/logout`
//! - `POST /auth/forgot-password`, `POST /auth/reset-password`, `GET /auth/change-email?token=`
//!
//! ## Identity gate (valid access token)
//! - `GET /auth/me`
//!
//! ## Activity gate (active and verified account)
//! - `GET /profile`, `POST /profile/update`
//! - `GET /notes`, `POST /notes`, `PATCH /notes/{id}`, `DELETE /notes/{id}`
//! - `POST /folders`, `PATCH /folders/{id}`, `DELETE /folders/{id}`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bn_server::api::{create_router, AppState};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let state: AppState = unimplemented!();
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod notes;
pub mod profile;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use brain_notes::{
    auth::{AccountManager, AuthGate},
    db::Database,
    notes::NoteManager,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::CookieConfig;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountManager>,
    pub gate: Arc<AuthGate>,
    pub notes: Arc<NoteManager>,
    /// `None` when the server runs without PostgreSQL (router tests)
    pub database: Option<Database>,
    pub cookies: CookieConfig,
}

impl AppState {
    pub fn new(
        accounts: AccountManager,
        notes: NoteManager,
        database: Option<Database>,
        cookies: CookieConfig,
    ) -> Self {
        let gate = Arc::new(accounts.gate());
        Self {
            accounts: Arc::new(accounts),
            gate,
            notes: Arc::new(notes),
            database,
            cookies,
        }
    }
}

/// Create the API router with all endpoints and the request-id layer.
///
/// CORS is left to the caller, see [`cors_layer`].
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/verify", get(auth::verify))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/change-email", get(auth::change_email));

    let identity_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let active_routes = Router::new()
        .route("/profile", get(profile::get_profile))
        .route("/profile/update", post(profile::update_profile))
        .route("/notes", get(notes::tree).post(notes::create_note))
        .route(
            "/notes/{id}",
            patch(notes::update_note).delete(notes::delete_note),
        )
        .route("/folders", post(notes::create_folder))
        .route(
            "/folders/{id}",
            patch(notes::update_folder).delete(notes::delete_folder),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::active_user_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(identity_routes)
        .merge(active_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

/// CORS for the configured origins; permissive when none are configured.
///
/// Session cookies are only sent cross-origin when origins are listed, since
/// credentials cannot be combined with a wildcard origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring malformed CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers (or none is attached), otherwise
/// `503 Service Unavailable`.
///
/// ```bash
/// curl http://localhost:8000/health
/// # {"status":"healthy","database":true,"version":"1.0.0","timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => Some(db.health_check().await.is_ok()),
        None => None,
    };
    let healthy = database.unwrap_or(true);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
