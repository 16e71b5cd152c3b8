//! Plain-text bodies for each mail template.

use super::{MailTemplate, NotificationJob};

/// A mail ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

pub fn render(job: &NotificationJob) -> RenderedMail {
    let expiry = match job.valid_for_hours {
        Some(hours) => format!("\nThis link is valid for {hours} hours.\n"),
        None => String::new(),
    };

    let (subject, intro, outro) = match job.template {
        MailTemplate::EmailVerification => (
            "Confirm your email address",
            "Thanks for signing up for Brain Notes. Please confirm your email address by opening the link below:",
            "If you did not create an account, you can ignore this message.",
        ),
        MailTemplate::PasswordReset => (
            "Reset your password",
            "We received a request to reset your Brain Notes password. Open the link below to choose a new one:",
            "If you did not ask for a reset, you can ignore this message. Your password stays unchanged.",
        ),
        MailTemplate::EmailChange => (
            "Confirm your new email address",
            "A change of the email address on your Brain Notes account was requested. Open the link below to confirm this address:",
            "If you did not request this change, you can ignore this message.",
        ),
        MailTemplate::Welcome => (
            "Welcome to Brain Notes",
            "Your email address is confirmed and your account is ready. Start writing from your dashboard:",
            "Happy note taking!",
        ),
    };

    let body = format!(
        "Hello {username},\n\n{intro}\n\n{link}\n{expiry}\n{outro}\n\nThe Brain Notes team\n",
        username = job.username,
        link = job.link,
    );

    RenderedMail {
        subject: subject.to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(template: MailTemplate, valid_for_hours: Option<i64>) -> NotificationJob {
        NotificationJob {
            template,
            recipient: "alice@example.com".to_string(),
            username: "alice".to_string(),
            link: "http://localhost:8000/auth/verify?token=abc".to_string(),
            valid_for_hours,
        }
    }

    #[test]
    fn test_body_carries_link_and_name() {
        let mail = render(&job(MailTemplate::EmailVerification, Some(24)));
        assert_eq!(mail.subject, "Confirm your email address");
        assert!(mail.body.starts_with("Hello alice,"));
        assert!(mail.body.contains("http://localhost:8000/auth/verify?token=abc"));
        assert!(mail.body.contains("valid for 24 hours"));
    }

    #[test]
    fn test_welcome_has_no_expiry_hint() {
        let mail = render(&job(MailTemplate::Welcome, None));
        assert!(!mail.body.contains("valid for"));
    }
}
