//! Authentication configuration.

use std::fmt;

use chrono::Duration;

/// Upper bound for every token lifetime, roughly ten years
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

/// Secrets, token lifetimes and the public base URL used in emailed links.
///
/// Built once at startup and shared read-only.
#[derive(Clone)]
pub struct AuthConfig {
    /// Signs both session tokens and link tokens
    pub secret_key: String,

    /// Appended to passwords before hashing; empty disables it
    pub password_pepper: String,

    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub verification_token_hours: i64,
    pub password_reset_token_hours: i64,
    pub email_change_token_hours: i64,

    /// Base URL of the public site, e.g. `https://notes.example.com`
    pub app_url: String,
}

impl AuthConfig {
    /// Configuration with default lifetimes around `secret_key`
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            password_pepper: String::new(),
            access_token_minutes: 30,
            refresh_token_days: 7,
            verification_token_hours: 24,
            password_reset_token_hours: 24,
            email_change_token_hours: 24,
            app_url: "http://localhost:8000".to_string(),
        }
    }

    /// Saturates instead of panicking on out-of-range values
    pub fn access_token_duration(&self) -> Duration {
        Duration::try_minutes(self.access_token_minutes).unwrap_or(Duration::MAX)
    }

    pub fn refresh_token_duration(&self) -> Duration {
        Duration::try_days(self.refresh_token_days).unwrap_or(Duration::MAX)
    }

    pub fn verification_max_age_secs(&self) -> i64 {
        self.verification_token_hours.saturating_mul(3600)
    }

    pub fn password_reset_max_age_secs(&self) -> i64 {
        self.password_reset_token_hours.saturating_mul(3600)
    }

    pub fn email_change_max_age_secs(&self) -> i64 {
        self.email_change_token_hours.saturating_mul(3600)
    }

    /// `{app_url}{path}?token={token}`
    pub fn link(&self, path: &str, token: &str) -> String {
        format!("{}{}?token={}", self.app_url.trim_end_matches('/'), path, token)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("verification_token_hours", &self.verification_token_hours)
            .field("password_reset_token_hours", &self.password_reset_token_hours)
            .field("email_change_token_hours", &self.email_change_token_hours)
            .field("app_url", &self.app_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::new("s".repeat(32));
        assert_eq!(config.access_token_duration(), Duration::minutes(30));
        assert_eq!(config.refresh_token_duration(), Duration::days(7));
        assert_eq!(config.verification_max_age_secs(), 86_400);
    }

    #[test]
    fn test_huge_lifetimes_saturate() {
        let mut config = AuthConfig::new("s".repeat(32));
        config.refresh_token_days = i64::MAX;
        config.access_token_minutes = i64::MAX;
        config.email_change_token_hours = i64::MAX;
        assert_eq!(config.refresh_token_duration(), Duration::MAX);
        assert_eq!(config.access_token_duration(), Duration::MAX);
        assert_eq!(config.email_change_max_age_secs(), i64::MAX);
    }

    #[test]
    fn test_link_trims_trailing_slash() {
        let mut config = AuthConfig::new("s".repeat(32));
        config.app_url = "https://notes.example.com/".to_string();
        assert_eq!(
            config.link("/auth/verify", "abc.def.ghi"),
            "https://notes.example.com/auth/verify?token=abc.def.ghi"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AuthConfig::new("very_secret_signing_key_value_0001");
        config.password_pepper = "pepper_value_0001".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very_secret"));
        assert!(!rendered.contains("pepper_value"));
    }
}
