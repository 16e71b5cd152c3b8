//! Authentication API handlers.
//!
//! Registration, email verification, login, token refresh, logout, password
//! reset and email-change confirmation. Login and refresh return tokens in the
//! body and also set them as `HttpOnly` cookies for browser clients.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8000/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "alice", "email": "alice@example.com", "full_name": "Alice", "password": "hunter22"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8000/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "alice", "password": "hunter22"}'
//! ```

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
};
use brain_notes::auth::{
    AuthError, LoginRequest, PasswordResetConfirm, RegisterRequest, SessionTokens, UserProfile,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    AppState,
    cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE},
    error::{ApiError, api_error, auth_error},
    middleware::CurrentUser,
    request_id::RequestId,
};
use crate::{logging, metrics};

/// Token carried by a mailed link
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

const RESEND_MESSAGE: &str =
    "If an account with that email exists, a new verification link has been sent";
const FORGOT_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

/// Register a new account.
///
/// The account starts unverified; a verification link is mailed afterwards.
///
/// # Response
///
/// `201 Created` with the user profile.
///
/// # Errors
///
/// - `400 Bad Request`: invalid input, username or email already taken
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let user = state.accounts.register(request).await.map_err(auth_error)?;
    metrics::registrations_total();
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// Follow an email verification link.
///
/// Returns `{"status": "verified"}` or `{"status": "already_verified"}`.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .accounts
        .verify_email(&query.token)
        .await
        .map_err(auth_error)?;
    Ok(Json(json!({ "status": outcome })))
}

/// Mail a fresh verification link; the answer is the same for unknown emails.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .resend_verification(&request.email)
        .await
        .map_err(auth_error)?;
    Ok(MessageResponse::new(RESEND_MESSAGE))
}

/// Exchange credentials for an access/refresh token pair.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown username or wrong password
/// - `403 Forbidden`: account disabled or email not verified
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<SessionTokens>), ApiError> {
    let username = request.username.clone();
    match state.accounts.login(request).await {
        Ok((_, tokens)) => {
            metrics::login_attempts_total(true);

            let sessions = state.accounts.sessions();
            let mut headers = HeaderMap::new();
            append_cookie(
                &mut headers,
                cookies::session_cookie(
                    ACCESS_COOKIE,
                    &tokens.access_token,
                    sessions.access_token_duration().num_seconds(),
                    state.cookies.secure,
                ),
            );
            append_cookie(
                &mut headers,
                cookies::session_cookie(
                    REFRESH_COOKIE,
                    &tokens.refresh_token,
                    sessions.refresh_token_duration().num_seconds(),
                    state.cookies.secure,
                ),
            );
            Ok((headers, Json(tokens)))
        }
        Err(err) => {
            metrics::login_attempts_total(false);
            logging::log_security_event(
                "login_failed",
                Some(&username),
                Some(request_id.as_str()),
                &err.to_string(),
            );
            Err(auth_error(err))
        }
    }
}

/// Mint a new access token from a refresh token.
///
/// The refresh token is read from the JSON body, else from the
/// `refresh_token` cookie.
///
/// # Errors
///
/// - `401 Unauthorized`: missing, invalid or expired token, or unknown subject
/// - `403 Forbidden`: an access token was presented, or the account is unusable
pub async fn refresh(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<(HeaderMap, Json<AccessTokenResponse>), ApiError> {
    let token = body
        .and_then(|Json(body)| body.refresh_token)
        .filter(|token| !token.trim().is_empty())
        .or_else(|| cookies::read_cookie(&headers, REFRESH_COOKIE))
        .ok_or_else(|| {
            metrics::token_rejections_total("missing");
            api_error(StatusCode::UNAUTHORIZED, "Not authenticated")
        })?;

    let access_token = state.accounts.refresh(&token).await.map_err(|err| {
        if matches!(
            err,
            AuthError::InvalidToken | AuthError::WrongTokenType { .. } | AuthError::Unauthorized
        ) {
            logging::log_security_event(
                "refresh_rejected",
                None,
                Some(request_id.as_str()),
                &err.to_string(),
            );
        }
        auth_error(err)
    })?;

    let mut response_headers = HeaderMap::new();
    append_cookie(
        &mut response_headers,
        cookies::session_cookie(
            ACCESS_COOKIE,
            &access_token,
            state.accounts.sessions().access_token_duration().num_seconds(),
            state.cookies.secure,
        ),
    );
    Ok((
        response_headers,
        Json(AccessTokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }),
    ))
}

/// Clear the session cookies. Tokens are stateless and stay valid until they expire.
pub async fn logout(State(state): State<AppState>) -> (HeaderMap, Json<MessageResponse>) {
    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        cookies::clear_cookie(ACCESS_COOKIE, state.cookies.secure),
    );
    append_cookie(
        &mut headers,
        cookies::clear_cookie(REFRESH_COOKIE, state.cookies.secure),
    );
    (headers, MessageResponse::new("Logged out"))
}

/// Profile of the token's subject, whatever its activity state
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// Mail a password reset link; the answer is the same for unknown emails.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .forgot_password(&request.email)
        .await
        .map_err(auth_error)?;
    Ok(MessageResponse::new(FORGOT_MESSAGE))
}

/// Set a new password from a reset link token.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .reset_password(&request.token, &request.new_password)
        .await
        .map_err(auth_error)?;
    Ok(MessageResponse::new("Password has been reset"))
}

/// Confirm an email change from the link mailed to the new address.
pub async fn change_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .accounts
        .confirm_email_change(&query.token)
        .await
        .map_err(auth_error)?;
    Ok(Json(UserProfile::from(&user)))
}

fn append_cookie(headers: &mut HeaderMap, cookie: Option<axum::http::HeaderValue>) {
    match cookie {
        Some(value) => {
            headers.append(SET_COOKIE, value);
        }
        None => tracing::warn!("Skipping session cookie with invalid header characters"),
    }
}
