//! Authorization gate every protected operation passes through.
//!
//! Re-evaluated on every call with no caching: the token says who signed
//! in, the store says whether that account is still there and usable.

use std::sync::Arc;

use super::{
    errors::{AuthError, AuthResult},
    models::User,
    session_token::{SessionClaims, SessionTokenIssuer, TokenType},
};
use crate::db::UserRepository;

/// Resolves session tokens into users
#[derive(Clone)]
pub struct AuthGate {
    sessions: SessionTokenIssuer,
    users: Arc<dyn UserRepository>,
}

impl AuthGate {
    pub fn new(sessions: SessionTokenIssuer, users: Arc<dyn UserRepository>) -> Self {
        Self { sessions, users }
    }

    /// Decode a token and require it to be an access token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Token does not decode
    /// * `AuthError::WrongTokenType` - A refresh token was presented
    pub fn resolve_access(&self, token: &str) -> AuthResult<SessionClaims> {
        let claims = self.sessions.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType {
                expected: TokenType::Access,
            });
        }
        Ok(claims)
    }

    /// Resolve an access token to the current user record
    ///
    /// # Errors
    ///
    /// Everything [`AuthGate::resolve_access`] returns, plus
    /// `AuthError::Unauthorized` when the subject no longer exists.
    pub async fn authenticate(&self, token: &str) -> AuthResult<User> {
        let claims = self.resolve_access(token)?;
        self.users
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    /// Resolve an access token to a user that is active and verified
    pub async fn authenticate_active(&self, token: &str) -> AuthResult<User> {
        let user = self.authenticate(token).await?;
        ensure_usable(&user)?;
        Ok(user)
    }
}

/// The activity gate: disabled or unverified accounts are refused.
pub fn ensure_usable(user: &User) -> AuthResult<()> {
    if !user.is_active {
        return Err(AuthError::AccountDisabled);
    }
    if !user.is_verified {
        return Err(AuthError::EmailNotVerified);
    }
    Ok(())
}
