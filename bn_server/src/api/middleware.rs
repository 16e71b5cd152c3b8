//! Authentication middleware for protected endpoints.
//!
//! The access token is read from `Authorization: Bearer <token>` or, for
//! browser clients, from the `access_token` cookie. The resolved account is
//! injected into request extensions as [`CurrentUser`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use bn_server::api::middleware::active_user_middleware;
//! # use bn_server::api::AppState;
//! # async fn handler() {}
//! # let state: AppState = unimplemented!();
//!
//! let protected_routes: Router<AppState> = Router::new()
//!     .route("/profile", get(handler))
//!     .layer(middleware::from_fn_with_state(state.clone(), active_user_middleware));
//! # let _ = protected_routes;
//! ```

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use brain_notes::auth::{AuthError, User};

use super::{
    AppState, cookies,
    error::{ApiError, api_error, auth_error},
    request_id::RequestId,
};
use crate::{logging, metrics};

/// The signed-in account, available to handlers behind the middleware
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Identity gate: any existing account with a valid access token
///
/// # Behavior
///
/// - **Missing token**: `401 Unauthorized`
/// - **Invalid/expired token or unknown subject**: `401 Unauthorized`
/// - **Refresh token presented**: `403 Forbidden`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = require_token(&request)?;
    let request_id = request.extensions().get::<RequestId>().cloned();
    let user = state
        .gate
        .authenticate(&token)
        .await
        .map_err(|err| reject(err, request_id.as_ref()))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Identity gate plus the activity gate: the account must be active and verified
pub async fn active_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = require_token(&request)?;
    let request_id = request.extensions().get::<RequestId>().cloned();
    let user = state
        .gate
        .authenticate_active(&token)
        .await
        .map_err(|err| reject(err, request_id.as_ref()))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn require_token(request: &Request) -> Result<String, ApiError> {
    cookies::access_token(request.headers()).ok_or_else(|| {
        metrics::token_rejections_total("missing");
        api_error(StatusCode::UNAUTHORIZED, "Not authenticated")
    })
}

fn reject(err: AuthError, request_id: Option<&RequestId>) -> ApiError {
    let reason = match &err {
        AuthError::InvalidToken => "invalid",
        AuthError::WrongTokenType { .. } => "wrong_type",
        AuthError::Unauthorized => "unknown_subject",
        AuthError::AccountDisabled => "disabled",
        AuthError::EmailNotVerified => "unverified",
        _ => "error",
    };
    metrics::token_rejections_total(reason);
    if matches!(reason, "invalid" | "wrong_type" | "unknown_subject") {
        logging::log_security_event(
            "token_rejected",
            None,
            request_id.map(RequestId::as_str),
            &err.to_string(),
        );
    }
    auth_error(err)
}
