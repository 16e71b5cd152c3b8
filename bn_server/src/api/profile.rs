//! Profile handlers.
//!
//! `POST /profile/update` performs exactly one action per request, picked in
//! the order email change, password change, full name.

use axum::{Extension, Json, extract::State, http::StatusCode};
use brain_notes::auth::{AuthError, UserProfile};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    error::{ApiError, api_error, auth_error},
    middleware::CurrentUser,
};

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub user: UserProfile,
}

pub async fn get_profile(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// Apply one profile change.
///
/// # Errors
///
/// - `400 Bad Request`: nothing to update, half a password pair, invalid input
/// - `401 Unauthorized`: wrong old password
/// - `403 Forbidden`: the new email belongs to another account
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileUpdateResponse>, ApiError> {
    let accounts = &state.accounts;

    if let Some(email) = non_blank(update.email) {
        accounts
            .request_email_change(&user, &email)
            .await
            .map_err(|err| match err {
                AuthError::EmailTaken => {
                    api_error(StatusCode::FORBIDDEN, AuthError::EmailTaken.client_message())
                }
                other => auth_error(other),
            })?;
        return Ok(Json(ProfileUpdateResponse {
            message: "A confirmation link has been sent to the new email address".to_string(),
            user: UserProfile::from(&user),
        }));
    }

    match (non_blank(update.old_password), non_blank(update.new_password)) {
        (Some(old), Some(new)) => {
            accounts
                .change_password(&user, &old, &new)
                .await
                .map_err(auth_error)?;
            return Ok(Json(ProfileUpdateResponse {
                message: "Password updated".to_string(),
                user: UserProfile::from(&user),
            }));
        }
        (None, None) => {}
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Both old_password and new_password are required",
            ));
        }
    }

    if let Some(full_name) = non_blank(update.full_name) {
        let user = accounts
            .update_full_name(&user, &full_name)
            .await
            .map_err(auth_error)?;
        return Ok(Json(ProfileUpdateResponse {
            message: "Profile updated".to_string(),
            user: UserProfile::from(&user),
        }));
    }

    Err(api_error(StatusCode::BAD_REQUEST, "Nothing to update"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
