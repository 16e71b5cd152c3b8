//! Outgoing account mail.
//!
//! Account operations never talk to a mail server directly. They hand a
//! [`NotificationJob`] to a [`Notifier`], which for the running service is
//! the [`NotificationQueue`]: a bounded channel drained by one worker task
//! that delivers through a [`MailSink`] with bounded retry. Delivery
//! failures are logged and never reach the request that triggered the mail.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod config;
pub mod queue;
pub mod recording;
pub mod smtp;
pub mod templates;

pub use config::MailConfig;
pub use queue::{NotificationQueue, QueueSettings};
pub use recording::{RecordingMailer, RecordingNotifier};
pub use smtp::{LogMailer, SmtpMailer};
pub use templates::{RenderedMail, render};

/// The kinds of mail the service sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    EmailVerification,
    PasswordReset,
    EmailChange,
    Welcome,
}

impl MailTemplate {
    /// Stable identifier used in logs and metrics
    pub fn id(&self) -> &'static str {
        match self {
            MailTemplate::EmailVerification => "email_verification",
            MailTemplate::PasswordReset => "password_reset",
            MailTemplate::EmailChange => "email_change",
            MailTemplate::Welcome => "welcome",
        }
    }
}

impl std::fmt::Display for MailTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One mail waiting to be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub template: MailTemplate,
    pub recipient: String,
    pub username: String,
    pub link: String,
    /// How long the link stays valid, shown to the reader
    pub valid_for_hours: Option<i64>,
}

/// Accepts mail for later delivery
///
/// `enqueue` is synchronous and infallible from the caller's point of view;
/// implementations log what they cannot accept.
pub trait Notifier: Send + Sync {
    fn enqueue(&self, job: NotificationJob);
}

/// Delivers a single mail
#[async_trait]
pub trait MailSink: Send + Sync {
    async fn send(&self, job: &NotificationJob) -> MailResult<()>;
}

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail is misconfigured: {0}")]
    Config(String),
}

pub type MailResult<T> = Result<T, MailError>;
