//! Bounded mail queue with a single delivery worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::{MailConfig, MailSink, Notifier, NotificationJob};

/// Queue sizing and retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from(&MailConfig::default())
    }
}

impl From<&MailConfig> for QueueSettings {
    fn from(config: &MailConfig) -> Self {
        Self {
            capacity: config.queue_capacity.max(1),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Handle for enqueuing mail; cheap to clone
///
/// The worker exits once every handle is dropped and the backlog is drained.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationJob>,
}

impl NotificationQueue {
    /// Start the delivery worker on the current tokio runtime
    pub fn spawn(sink: Arc<dyn MailSink>, settings: QueueSettings) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NotificationJob>(settings.capacity);

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                deliver(sink.as_ref(), &job, &settings).await;
            }
            log::debug!("Notification queue closed");
        });

        (Self { tx }, worker)
    }
}

impl Notifier for NotificationQueue {
    fn enqueue(&self, job: NotificationJob) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                log::warn!(
                    "Notification queue full, dropping {} mail to {}",
                    job.template,
                    job.recipient
                );
            }
            Err(TrySendError::Closed(job)) => {
                log::warn!(
                    "Notification queue closed, dropping {} mail to {}",
                    job.template,
                    job.recipient
                );
            }
        }
    }
}

async fn deliver(sink: &dyn MailSink, job: &NotificationJob, settings: &QueueSettings) {
    let mut backoff = settings.retry_backoff;
    for attempt in 1..=settings.max_attempts {
        match sink.send(job).await {
            Ok(()) => return,
            Err(e) if attempt < settings.max_attempts => {
                log::warn!(
                    "Delivery of {} mail to {} failed (attempt {}/{}): {}",
                    job.template,
                    job.recipient,
                    attempt,
                    settings.max_attempts,
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(e) => {
                log::error!(
                    "Giving up on {} mail to {} after {} attempts: {}",
                    job.template,
                    job.recipient,
                    settings.max_attempts,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{MailTemplate, RecordingMailer};

    fn job(recipient: &str) -> NotificationJob {
        NotificationJob {
            template: MailTemplate::EmailVerification,
            recipient: recipient.to_string(),
            username: "alice".to_string(),
            link: "http://localhost:8000/auth/verify?token=t".to_string(),
            valid_for_hours: Some(24),
        }
    }

    fn settings(max_attempts: u32) -> QueueSettings {
        QueueSettings {
            capacity: 8,
            max_attempts,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_jobs_are_delivered_in_order() {
        let sink = Arc::new(RecordingMailer::new());
        let (queue, worker) = NotificationQueue::spawn(sink.clone(), settings(3));

        queue.enqueue(job("a@example.com"));
        queue.enqueue(job("b@example.com"));
        drop(queue);
        worker.await.unwrap();

        let recipients: Vec<String> = sink.sent().into_iter().map(|j| j.recipient).collect();
        assert_eq!(recipients, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let sink = Arc::new(RecordingMailer::failing(2));
        let (queue, worker) = NotificationQueue::spawn(sink.clone(), settings(3));

        queue.enqueue(job("a@example.com"));
        drop(queue);
        worker.await.unwrap();

        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sink = Arc::new(RecordingMailer::failing(10));
        let (queue, worker) = NotificationQueue::spawn(sink.clone(), settings(2));

        queue.enqueue(job("a@example.com"));
        queue.enqueue(job("b@example.com"));
        drop(queue);
        worker.await.unwrap();

        assert_eq!(sink.attempts(), 4);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_settings_from_config_clamp_to_one() {
        let config = MailConfig {
            max_attempts: 0,
            queue_capacity: 0,
            ..Default::default()
        };
        let settings = QueueSettings::from(&config);
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.capacity, 1);
    }
}
