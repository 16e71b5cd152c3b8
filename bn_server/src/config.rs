//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use brain_notes::{
    auth::{AuthConfig, config::MAX_TOKEN_LIFETIME_DAYS},
    db::DatabaseConfig,
    mail::MailConfig,
};
use std::net::SocketAddr;

const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/brain_notes";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Secrets, token lifetimes and public URL
    pub auth: AuthConfig,
    /// SMTP and delivery settings
    pub mail: MailConfig,
    /// Session cookie attributes
    pub cookies: CookieConfig,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Prometheus scrape endpoint, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Session cookie settings
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieConfig {
    /// Add the `Secure` attribute (HTTPS deployments)
    pub secure: bool,
}

impl ServerConfig {
    /// Load configuration from the process environment
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
        )
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(
        lookup: F,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let bind = match bind_override {
            Some(bind) => bind,
            None => env.parse_or("SERVER_BIND", default_bind())?,
        };

        let database_url = database_url_override
            .or_else(|| env.get("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database = DatabaseConfig {
            database_url,
            max_connections: env.parse_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: env.parse_or("DB_MIN_CONNECTIONS", 1)?,
            connection_timeout_secs: env.parse_or("DB_CONNECTION_TIMEOUT_SECS", 10)?,
            idle_timeout_secs: env.parse_or("DB_IDLE_TIMEOUT_SECS", 600)?,
            max_lifetime_secs: env.parse_or("DB_MAX_LIFETIME_SECS", 1800)?,
        };

        // Security configuration (REQUIRED)
        let secret_key = env.get("SECRET_KEY").ok_or_else(|| ConfigError::MissingRequired {
            var: "SECRET_KEY".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;
        if secret_key.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "SECRET_KEY".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        let password_pepper = env.get("PASSWORD_PEPPER").unwrap_or_default();
        if !password_pepper.is_empty() && password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security) when set".to_string(),
            });
        }

        let mut auth = AuthConfig::new(secret_key);
        auth.password_pepper = password_pepper;
        auth.access_token_minutes =
            env.parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", auth.access_token_minutes)?;
        auth.refresh_token_days = env.parse_or("REFRESH_TOKEN_EXPIRE_DAYS", auth.refresh_token_days)?;
        auth.verification_token_hours =
            env.parse_or("VERIFICATION_TOKEN_EXPIRE_HOURS", auth.verification_token_hours)?;
        auth.password_reset_token_hours =
            env.parse_or("PASSWORD_RESET_TOKEN_EXPIRE_HOURS", auth.password_reset_token_hours)?;
        auth.email_change_token_hours =
            env.parse_or("EMAIL_CHANGE_TOKEN_EXPIRE_HOURS", auth.email_change_token_hours)?;
        if let Some(app_url) = env.get("APP_URL") {
            auth.app_url = app_url;
        }

        let defaults = MailConfig::default();
        let mail = MailConfig {
            server: env.get("MAIL_SERVER").unwrap_or(defaults.server),
            port: env.parse_or("MAIL_PORT", defaults.port)?,
            username: env.get("MAIL_USERNAME").unwrap_or_default(),
            password: env.get("MAIL_PASSWORD").unwrap_or_default(),
            from: env.get("MAIL_FROM").unwrap_or_default(),
            starttls: env.parse_or("MAIL_TLS", defaults.starttls)?,
            implicit_tls: env.parse_or("MAIL_SSL", defaults.implicit_tls)?,
            max_attempts: env.parse_or("MAIL_MAX_ATTEMPTS", defaults.max_attempts)?,
            queue_capacity: env.parse_or("MAIL_QUEUE_CAPACITY", defaults.queue_capacity)?,
            retry_backoff_ms: env.parse_or("MAIL_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
        };

        let cookies = CookieConfig {
            secure: env.parse_or("COOKIE_SECURE", false)?,
        };

        let cors_origins = env
            .get("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let metrics_bind = match env.get("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not an IP:PORT address"),
            })?),
            None => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            auth,
            mail,
            cookies,
            cors_origins,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MAX_HOURS: i64 = MAX_TOKEN_LIFETIME_DAYS * 24;
        let lifetimes = [
            ("ACCESS_TOKEN_EXPIRE_MINUTES", self.auth.access_token_minutes, MAX_HOURS * 60),
            ("REFRESH_TOKEN_EXPIRE_DAYS", self.auth.refresh_token_days, MAX_TOKEN_LIFETIME_DAYS),
            ("VERIFICATION_TOKEN_EXPIRE_HOURS", self.auth.verification_token_hours, MAX_HOURS),
            ("PASSWORD_RESET_TOKEN_EXPIRE_HOURS", self.auth.password_reset_token_hours, MAX_HOURS),
            ("EMAIL_CHANGE_TOKEN_EXPIRE_HOURS", self.auth.email_change_token_hours, MAX_HOURS),
        ];
        for (var, value, max) in lifetimes {
            if !(1..=max).contains(&value) {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must be between 1 and {max}"),
                });
            }
        }

        if self.auth.refresh_token_duration() <= self.auth.access_token_duration() {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                reason: format!(
                    "Refresh tokens must outlive access tokens ({} minutes)",
                    self.auth.access_token_minutes
                ),
            });
        }

        if !(self.auth.app_url.starts_with("http://") || self.auth.app_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                var: "APP_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        if self.mail.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "MAIL_MAX_ATTEMPTS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.mail.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "MAIL_QUEUE_CAPACITY".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of `key`
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse `key`, falling back to `default` when unset; a malformed value is an error
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
    {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("Cannot parse '{raw}'"),
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned(), None, None)
    }

    const SECRET: (&str, &str) = ("SECRET_KEY", "0123456789abcdef0123456789abcdef");

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "SECRET_KEY".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SECRET_KEY"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[SECRET]).unwrap();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.auth.access_token_minutes, 30);
        assert_eq!(config.auth.refresh_token_days, 7);
        assert_eq!(config.auth.app_url, "http://localhost:8000");
        assert_eq!(config.mail.port, 587);
        assert_eq!(config.mail.max_attempts, 3);
        assert!(config.metrics_bind.is_none());
        assert!(!config.cookies.secure);
        config.validate().unwrap();
    }

    #[test]
    fn test_secret_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::MissingRequired { .. })
        ));
        assert!(matches!(
            load(&[("SECRET_KEY", "short")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_short_pepper_rejected() {
        assert!(matches!(
            load(&[SECRET, ("PASSWORD_PEPPER", "tiny")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_malformed_number_rejected() {
        let err = load(&[SECRET, ("MAIL_PORT", "smtp")]).unwrap_err();
        assert!(err.to_string().contains("MAIL_PORT"));
    }

    #[test]
    fn test_cors_origins_split() {
        let config = load(&[
            SECRET,
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_validation_rejects_zero_lifetime() {
        let config = load(&[SECRET, ("ACCESS_TOKEN_EXPIRE_MINUTES", "0")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_oversized_lifetimes() {
        for (var, value) in [
            ("REFRESH_TOKEN_EXPIRE_DAYS", "100000000"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "9223372036854775807"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "9223372036854775807"),
            ("EMAIL_CHANGE_TOKEN_EXPIRE_HOURS", "9223372036854775807"),
        ] {
            let config = load(&[SECRET, (var, value)]).unwrap();
            match config.validate() {
                Err(ConfigError::Invalid { var: got, .. }) => assert_eq!(got, var),
                other => panic!("{var}={value} accepted: {other:?}"),
            }
        }

        let config = load(&[SECRET, ("REFRESH_TOKEN_EXPIRE_DAYS", "3650")]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_refresh_must_outlive_access() {
        let config = load(&[
            SECRET,
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "20160"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "7"),
        ])
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REFRESH_TOKEN_EXPIRE_DAYS"));
    }

    #[test]
    fn test_validation_app_url_scheme() {
        let config = load(&[SECRET, ("APP_URL", "notes.example.com")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_process_env_with_overrides() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("SECRET_KEY", SECRET.1);
            std::env::set_var("COOKIE_SECURE", "true");
        }

        let config = ServerConfig::from_env(
            Some("0.0.0.0:9000".parse().unwrap()),
            Some("postgres://override@db/notes".to_string()),
        )
        .unwrap();

        unsafe {
            std::env::remove_var("SECRET_KEY");
            std::env::remove_var("COOKIE_SECURE");
        }

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.database.database_url, "postgres://override@db/notes");
        assert!(config.cookies.secure);
    }
}
