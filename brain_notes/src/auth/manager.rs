//! Account lifecycle: registration, verification, login and credential changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    gate::{AuthGate, ensure_usable},
    hasher::CredentialHasher,
    models::{
        LoginRequest, NewUser, RegisterRequest, SessionTokens, User, UserId, UserPatch,
        VerifyOutcome,
    },
    session_token::{SessionTokenIssuer, TokenType},
    signed_token::{SignedTokenCodec, SignedTokenError, TokenPurpose},
    validation::{
        normalize_email, validate_email, validate_full_name, validate_password, validate_username,
    },
};
use crate::db::UserRepository;
use crate::mail::{MailTemplate, NotificationJob, Notifier};

/// Payload of an email-change link
#[derive(Debug, Serialize, Deserialize)]
struct EmailChangeClaim {
    uid: UserId,
    email: String,
}

/// Account manager
///
/// Owns every operation that creates or mutates an account. Mail is only
/// enqueued after the write it announces has succeeded.
#[derive(Clone)]
pub struct AccountManager {
    config: Arc<AuthConfig>,
    hasher: CredentialHasher,
    links: SignedTokenCodec,
    sessions: SessionTokenIssuer,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
}

impl AccountManager {
    /// Create a new account manager
    ///
    /// # Arguments
    ///
    /// * `config` - Secrets, lifetimes and the public base URL
    /// * `users` - User storage
    /// * `notifier` - Where outgoing mail is handed off
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let secret = config.secret_key.as_bytes();
        Self {
            hasher: CredentialHasher::new(config.password_pepper.clone()),
            links: SignedTokenCodec::new(secret),
            sessions: SessionTokenIssuer::new(
                secret,
                config.access_token_duration(),
                config.refresh_token_duration(),
            ),
            config: Arc::new(config),
            users,
            notifier,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionTokenIssuer {
        &self.sessions
    }

    /// An authorization gate sharing this manager's signing key and store
    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.sessions.clone(), Arc::clone(&self.users))
    }

    /// Register a new, unverified user and mail them a verification link
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidUsername` / `InvalidEmail` / `InvalidFullName` / `WeakPassword`
    /// * `AuthError::EmailTaken` - Email already registered
    /// * `AuthError::UsernameTaken` - Username already registered
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);
        let full_name = request.full_name.trim().to_string();

        validate_username(&username)?;
        validate_email(&email)?;
        validate_full_name(&full_name)?;
        validate_password(&request.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let hashed_password = self.hash_password(&request.password).await?;
        let user = self
            .users
            .insert_user(NewUser {
                username,
                email,
                full_name,
                hashed_password,
            })
            .await?;

        log::info!("Registered user {} (id {})", user.username, user.id);
        self.send_verification(&user);
        Ok(user)
    }

    /// Follow a verification link
    ///
    /// Verifying twice is not an error; the welcome mail goes out only the
    /// first time.
    pub async fn verify_email(&self, token: &str) -> AuthResult<VerifyOutcome> {
        let email = self.links.read(
            token,
            TokenPurpose::EmailVerification,
            self.config.verification_max_age_secs(),
        )?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_verified {
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        let patch = UserPatch {
            is_verified: Some(true),
            ..Default::default()
        };
        if !self.users.update_user(user.id, patch).await? {
            return Err(AuthError::UserNotFound);
        }

        log::info!("Verified email for user {}", user.username);
        self.notifier.enqueue(NotificationJob {
            template: MailTemplate::Welcome,
            recipient: user.email.clone(),
            username: user.username.clone(),
            link: format!("{}/dashboard", self.config.app_url.trim_end_matches('/')),
            valid_for_hours: None,
        });
        Ok(VerifyOutcome::Verified)
    }

    /// Send a fresh verification link
    ///
    /// Unknown addresses succeed silently so the response does not reveal
    /// which emails are registered.
    ///
    /// # Errors
    ///
    /// * `AuthError::AlreadyVerified` - The account needs no verification
    pub async fn resend_verification(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            log::debug!("Verification resend requested for unknown address");
            return Ok(());
        };

        if user.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        self.send_verification(&user);
        Ok(())
    }

    /// Check credentials and mint a session
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown username or wrong password
    /// * `AuthError::AccountDisabled` - Account deactivated
    /// * `AuthError::EmailNotVerified` - Email not confirmed yet
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, SessionTokens)> {
        let user = self
            .users
            .find_by_username(request.username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .verify_password(&request.password, &user.hashed_password)
            .await
        {
            return Err(AuthError::InvalidCredentials);
        }

        ensure_usable(&user)?;

        let tokens = SessionTokens::bearer(
            self.sessions.create_access_token(&user.username)?,
            self.sessions.create_refresh_token(&user.username)?,
        );
        log::info!("User {} logged in", user.username);
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Token does not decode or has expired
    /// * `AuthError::WrongTokenType` - An access token was presented
    /// * `AuthError::Unauthorized` - The account no longer exists
    /// * `AuthError::AccountDisabled` / `EmailNotVerified`
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<String> {
        let claims = self.sessions.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType {
                expected: TokenType::Refresh,
            });
        }

        let user = self
            .users
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        ensure_usable(&user)?;

        self.sessions.create_access_token(&user.username)
    }

    /// Mail a password reset link to a registered address
    ///
    /// Always succeeds for well-formed input, registered or not.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            log::debug!("Password reset requested for unknown address");
            return Ok(());
        };

        let token = self.links.issue(&user.email, TokenPurpose::PasswordReset);
        self.notifier.enqueue(NotificationJob {
            template: MailTemplate::PasswordReset,
            recipient: user.email.clone(),
            username: user.username.clone(),
            link: self.config.link("/auth/reset-password", &token),
            valid_for_hours: Some(self.config.password_reset_token_hours),
        });
        Ok(())
    }

    /// Set a new password from a reset link
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        validate_password(new_password)?;

        let email = self.links.read(
            token,
            TokenPurpose::PasswordReset,
            self.config.password_reset_max_age_secs(),
        )?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.store_password(user.id, new_password).await?;
        log::info!("Password reset for user {}", user.username);
        Ok(())
    }

    /// Mail a confirmation link to `new_email`; nothing changes until it is followed
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidEmail` - Malformed address
    /// * `AuthError::Validation` - Same as the current address
    /// * `AuthError::EmailTaken` - Address belongs to another account
    pub async fn request_email_change(&self, user: &User, new_email: &str) -> AuthResult<()> {
        let new_email = normalize_email(new_email);
        validate_email(&new_email)?;

        if new_email == user.email {
            return Err(AuthError::Validation(
                "New email must differ from the current one".to_string(),
            ));
        }
        if self.users.find_by_email(&new_email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let claim = EmailChangeClaim {
            uid: user.id,
            email: new_email.clone(),
        };
        let payload = serde_json::to_string(&claim)
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        let token = self.links.issue(&payload, TokenPurpose::EmailChange);

        self.notifier.enqueue(NotificationJob {
            template: MailTemplate::EmailChange,
            recipient: new_email,
            username: user.username.clone(),
            link: self.config.link("/auth/change-email", &token),
            valid_for_hours: Some(self.config.email_change_token_hours),
        });
        Ok(())
    }

    /// Apply an email change from its confirmation link
    ///
    /// Uniqueness is checked again here since the address may have been
    /// taken after the link was sent. Following the link proves ownership
    /// of the new address, so the account counts as verified afterwards.
    pub async fn confirm_email_change(&self, token: &str) -> AuthResult<User> {
        let payload = self.links.read(
            token,
            TokenPurpose::EmailChange,
            self.config.email_change_max_age_secs(),
        )?;
        let claim: EmailChangeClaim = serde_json::from_str(&payload)
            .map_err(|_| AuthError::Link(SignedTokenError::InvalidSignature))?;

        let mut user = self
            .users
            .find_by_id(claim.uid)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        match self.users.find_by_email(&claim.email).await? {
            Some(owner) if owner.id == user.id => {
                // The link still proves ownership even when it was already applied.
                if !user.is_verified {
                    let patch = UserPatch {
                        is_verified: Some(true),
                        ..Default::default()
                    };
                    if !self.users.update_user(user.id, patch).await? {
                        return Err(AuthError::UserNotFound);
                    }
                    user.is_verified = true;
                }
                return Ok(user);
            }
            Some(_) => return Err(AuthError::EmailTaken),
            None => {}
        }

        let patch = UserPatch {
            email: Some(claim.email.clone()),
            is_verified: Some(true),
            ..Default::default()
        };
        if !self.users.update_user(user.id, patch).await? {
            return Err(AuthError::UserNotFound);
        }

        log::info!("User {} changed email", user.username);
        user.email = claim.email;
        user.is_verified = true;
        Ok(user)
    }

    /// Change the password of a signed-in user
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - `old_password` is wrong
    /// * `AuthError::WeakPassword` - `new_password` is too short
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        if !self
            .verify_password(old_password, &user.hashed_password)
            .await
        {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password)?;

        self.store_password(user.id, new_password).await?;
        log::info!("User {} changed password", user.username);
        Ok(())
    }

    pub async fn update_full_name(&self, user: &User, full_name: &str) -> AuthResult<User> {
        let full_name = full_name.trim().to_string();
        validate_full_name(&full_name)?;

        let patch = UserPatch {
            full_name: Some(full_name.clone()),
            ..Default::default()
        };
        if !self.users.update_user(user.id, patch).await? {
            return Err(AuthError::UserNotFound);
        }

        let mut user = user.clone();
        user.full_name = full_name;
        Ok(user)
    }

    fn send_verification(&self, user: &User) {
        let token = self.links.issue(&user.email, TokenPurpose::EmailVerification);
        self.notifier.enqueue(NotificationJob {
            template: MailTemplate::EmailVerification,
            recipient: user.email.clone(),
            username: user.username.clone(),
            link: self.config.link("/auth/verify", &token),
            valid_for_hours: Some(self.config.verification_token_hours),
        });
    }

    async fn store_password(&self, user_id: UserId, password: &str) -> AuthResult<()> {
        let hashed_password = self.hash_password(password).await?;
        let patch = UserPatch {
            hashed_password: Some(hashed_password),
            ..Default::default()
        };
        if !self.users.update_user(user_id, patch).await? {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    /// Argon2 is deliberately slow; keep it off the async workers.
    async fn hash_password(&self, password: &str) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AuthError::HashingFailed)?
    }

    async fn verify_password(&self, password: &str, digest: &str) -> bool {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .unwrap_or(false)
    }
}
