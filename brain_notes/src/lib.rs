//! # Brain Notes
//!
//! Account, session and notes core of the Brain Notes service.
//!
//! ## Core Modules
//!
//! - [`auth`]: Credential hashing, session tokens, signed links, the
//!   authorization gate and the account lifecycle
//! - [`db`]: PostgreSQL pool, repositories and an in-memory store
//! - [`mail`]: Notification queue and mail sinks
//! - [`notes`]: Per-user notes and nested folders
//!
//! ## Example
//!
//! ```
//! use brain_notes::auth::{SignedTokenCodec, TokenPurpose};
//!
//! let codec = SignedTokenCodec::new("a_signing_secret_of_at_least_32_chars");
//! let token = codec.issue("alice@example.com", TokenPurpose::EmailVerification);
//! assert_eq!(
//!     codec.read(&token, TokenPurpose::EmailVerification, 3600).unwrap(),
//!     "alice@example.com"
//! );
//! ```

/// Authentication and account management.
pub mod auth;

/// Database layer.
pub mod db;

/// Outgoing mail.
pub mod mail;

/// Notes and folders.
pub mod notes;
