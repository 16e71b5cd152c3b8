//! SMTP delivery via lettre, and a log-only stand-in.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, message::Mailbox,
    transport::smtp::authentication::Credentials,
};

use super::{MailConfig, MailError, MailResult, MailSink, NotificationJob, render};

/// Sends mail through an SMTP relay
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport; no connection is opened until the first send
    pub fn new(config: &MailConfig) -> MailResult<Self> {
        let from: Mailbox = config
            .sender()
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {e}", config.sender())))?;

        let builder = if config.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.server,
            ))
        }
        .map_err(|e| MailError::Config(format!("SMTP setup failed: {e}")))?;

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailSink for SmtpMailer {
    async fn send(&self, job: &NotificationJob) -> MailResult<()> {
        let to: Mailbox = job
            .recipient
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {e}", job.recipient)))?;
        let mail = render(job);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        log::info!("Sent {} mail to {}", job.template, job.recipient);
        Ok(())
    }
}

/// Used when no SMTP server is configured: records that a mail would have
/// gone out, without the link
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl MailSink for LogMailer {
    async fn send(&self, job: &NotificationJob) -> MailResult<()> {
        log::warn!(
            "Mail not configured, skipping {} mail to {}",
            job.template,
            job.recipient
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MailTemplate;

    #[test]
    fn test_invalid_sender_rejected() {
        let config = MailConfig {
            from: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(SmtpMailer::new(&config), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected_before_connecting() {
        let config = MailConfig {
            from: "noreply@brainnotes.test".to_string(),
            server: "localhost".to_string(),
            starttls: false,
            ..Default::default()
        };
        let mailer = SmtpMailer::new(&config).unwrap();
        let job = NotificationJob {
            template: MailTemplate::Welcome,
            recipient: "nope".to_string(),
            username: "alice".to_string(),
            link: "http://localhost:8000/dashboard".to_string(),
            valid_for_hours: None,
        };
        assert!(matches!(mailer.send(&job).await, Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let job = NotificationJob {
            template: MailTemplate::PasswordReset,
            recipient: "alice@example.com".to_string(),
            username: "alice".to_string(),
            link: "http://localhost:8000/auth/reset-password?token=t".to_string(),
            valid_for_hours: Some(24),
        };
        assert!(LogMailer.send(&job).await.is_ok());
    }
}
