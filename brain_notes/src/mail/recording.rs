//! In-memory mail capture for tests and local runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{MailError, MailResult, MailSink, MailTemplate, Notifier, NotificationJob};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A `MailSink` that keeps every delivered job
///
/// [`RecordingMailer::failing`] makes the first `n` sends fail, to exercise
/// the queue's retry path.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<NotificationJob>>,
    attempts: AtomicUsize,
    fail_first: usize,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(fail_first: usize) -> Self {
        Self {
            fail_first,
            ..Self::default()
        }
    }

    /// Jobs delivered so far
    pub fn sent(&self) -> Vec<NotificationJob> {
        lock(&self.sent).clone()
    }

    /// Every call to `send`, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailSink for RecordingMailer {
    async fn send(&self, job: &NotificationJob) -> MailResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(MailError::Transport("simulated outage".to_string()));
        }
        lock(&self.sent).push(job.clone());
        Ok(())
    }
}

/// A `Notifier` that records jobs synchronously, skipping the queue
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    jobs: Mutex<Vec<NotificationJob>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<NotificationJob> {
        lock(&self.jobs).clone()
    }

    /// Jobs of one template, oldest first
    pub fn of(&self, template: MailTemplate) -> Vec<NotificationJob> {
        lock(&self.jobs)
            .iter()
            .filter(|j| j.template == template)
            .cloned()
            .collect()
    }

    /// The link of the newest job of `template`
    pub fn last_link(&self, template: MailTemplate) -> Option<String> {
        self.of(template).pop().map(|j| j.link)
    }

    /// The `token` query parameter of the newest link of `template`
    pub fn last_token(&self, template: MailTemplate) -> Option<String> {
        self.last_link(template)
            .and_then(|link| link.split_once("token=").map(|(_, t)| t.to_string()))
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, job: NotificationJob) {
        lock(&self.jobs).push(job);
    }
}
