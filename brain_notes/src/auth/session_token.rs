//! JWT access and refresh tokens.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::errors::{AuthError, AuthResult};

/// Discriminates access tokens from refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims shared by both token types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Username
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
}

/// Mints and decodes session tokens.
///
/// Pure claims encoding: a decoded token says who it was issued to and
/// until when, not whether that account still exists or may log in.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl SessionTokenIssuer {
    pub fn new(secret: &[u8], access_token_duration: Duration, refresh_token_duration: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_token_duration,
            refresh_token_duration,
        }
    }

    pub fn access_token_duration(&self) -> Duration {
        self.access_token_duration
    }

    pub fn refresh_token_duration(&self) -> Duration {
        self.refresh_token_duration
    }

    /// Generate a short-lived access token
    pub fn create_access_token(&self, subject: &str) -> AuthResult<String> {
        self.issue_at(subject, TokenType::Access, Utc::now())
    }

    /// Generate a long-lived refresh token
    pub fn create_refresh_token(&self, subject: &str) -> AuthResult<String> {
        self.issue_at(subject, TokenType::Refresh, Utc::now())
    }

    /// Generate a token of `token_type` as if issued at `issued_at`
    pub fn issue_at(
        &self,
        subject: &str,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
    ) -> AuthResult<String> {
        let lifetime = match token_type {
            TokenType::Access => self.access_token_duration,
            TokenType::Refresh => self.refresh_token_duration,
        };
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or(AuthError::LifetimeOutOfRange)?;
        let claims = SessionClaims {
            sub: subject.to_string(),
            token_type,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Decode and validate a token of either type
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Malformed, badly signed or expired
    pub fn decode(&self, token: &str) -> AuthResult<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected session token: {}", e);
                AuthError::InvalidToken
            })
    }
}
