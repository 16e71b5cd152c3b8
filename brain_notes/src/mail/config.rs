//! SMTP and delivery settings.

use std::time::Duration;

/// Mail configuration
#[derive(Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; falls back to `username` when empty
    pub from: String,
    /// Upgrade the connection with STARTTLS
    pub starttls: bool,
    /// Connect with implicit TLS (SMTPS), usually on port 465
    pub implicit_tls: bool,
    /// Delivery attempts per mail before giving up
    pub max_attempts: u32,
    /// Jobs the queue holds before new ones are dropped
    pub queue_capacity: usize,
    /// Delay before the first retry; doubles on each further retry
    pub retry_backoff_ms: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            starttls: true,
            implicit_tls: false,
            max_attempts: 3,
            queue_capacity: 256,
            retry_backoff_ms: 500,
        }
    }
}

impl MailConfig {
    /// Whether enough is set to talk to an SMTP server
    pub fn is_configured(&self) -> bool {
        !self.server.is_empty() && !self.sender().is_empty()
    }

    /// The address mail is sent from
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from", &self.from)
            .field("starttls", &self.starttls)
            .field("implicit_tls", &self.implicit_tls)
            .field("max_attempts", &self.max_attempts)
            .field("queue_capacity", &self.queue_capacity)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_falls_back_to_username() {
        let mut config = MailConfig {
            username: "bot@brainnotes.test".to_string(),
            ..Default::default()
        };
        assert_eq!(config.sender(), "bot@brainnotes.test");
        assert!(config.is_configured());

        config.from = "noreply@brainnotes.test".to_string();
        assert_eq!(config.sender(), "noreply@brainnotes.test");
    }

    #[test]
    fn test_unconfigured_by_default() {
        assert!(!MailConfig::default().is_configured());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = MailConfig {
            password: "app-password".to_string(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("app-password"));
    }
}
