//! Authentication and account lifecycle.
//!
//! This module implements:
//! - Argon2id password hashing with an optional server-side pepper
//! - JWT access tokens (30 minutes by default) and refresh tokens (7 days)
//! - Purpose-scoped signed links for email verification, password reset
//!   and email change
//! - The authorization gate protected operations pass through
//!
//! ## Example
//!
//! ```no_run
//! use brain_notes::auth::{AccountManager, AuthConfig, RegisterRequest};
//! use brain_notes::db::MemoryStore;
//! use brain_notes::mail::RecordingNotifier;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let accounts = AccountManager::new(
//!         AuthConfig::new("a_signing_secret_of_at_least_32_chars"),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(RecordingNotifier::new()),
//!     );
//!
//!     let user = accounts
//!         .register(RegisterRequest {
//!             username: "alice".to_string(),
//!             email: "alice@example.com".to_string(),
//!             full_name: "Alice".to_string(),
//!             password: "correct horse".to_string(),
//!         })
//!         .await?;
//!     println!("Registered user: {}", user.username);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod gate;
pub mod hasher;
pub mod manager;
pub mod models;
pub mod session_token;
pub mod signed_token;
pub mod validation;

pub use config::AuthConfig;
pub use errors::{AuthError, AuthResult, ErrorKind};
pub use gate::{AuthGate, ensure_usable};
pub use hasher::CredentialHasher;
pub use manager::AccountManager;
pub use models::{
    LoginRequest, NewUser, PasswordResetConfirm, RegisterRequest, SessionTokens, User, UserId,
    UserPatch, UserProfile, VerifyOutcome,
};
pub use session_token::{SessionClaims, SessionTokenIssuer, TokenType};
pub use signed_token::{SignedTokenCodec, SignedTokenError, TokenPurpose};
