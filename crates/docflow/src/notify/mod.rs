use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// A message addressed to a person or a channel. Delivery is a side channel;
/// no document operation depends on it succeeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// A dated follow-up created alongside a document event, e.g. a processing
/// deadline or an approval chase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTask {
    pub summary: String,
    pub assignee: Option<String>,
    pub due_date: NaiveDate,
}

#[derive(Debug, Error)]
#[error("delivery to '{recipient}' failed: {reason}")]
pub struct DeliveryError {
    pub recipient: String,
    pub reason: String,
}

/// Outbound message transport.
pub trait Notifier: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Destination for follow-up tasks raised by document events.
pub trait TaskSink: Send + Sync {
    fn push(&self, task: ReminderTask);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub recipient: String,
    pub subject: String,
    pub outcome: DeliveryOutcome,
    pub failure_reason: Option<String>,
    pub recorded_at: NaiveDateTime,
}

/// Append-only record of every delivery attempt, successful or not.
pub struct DeliveryLog {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, notification: &Notification, outcome: DeliveryOutcome, reason: Option<String>) {
        let mut records = self.records.lock().expect("delivery log mutex poisoned");
        records.push(DeliveryRecord {
            recipient: notification.recipient.clone(),
            subject: notification.subject.clone(),
            outcome,
            failure_reason: reason,
            recorded_at: Utc::now().naive_utc(),
        });
    }

    pub fn entries(&self) -> Vec<DeliveryRecord> {
        self.records
            .lock()
            .expect("delivery log mutex poisoned")
            .clone()
    }
}

impl Default for DeliveryLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempts delivery and swallows the failure into the log. Callers in the
/// document lifecycle must never see a transport error.
pub fn notify_best_effort<N: Notifier + ?Sized>(
    notifier: &N,
    log: &DeliveryLog,
    notification: &Notification,
) {
    match notifier.deliver(notification) {
        Ok(()) => log.record(notification, DeliveryOutcome::Sent, None),
        Err(err) => {
            warn!(
                recipient = %notification.recipient,
                reason = %err.reason,
                "notification delivery failed"
            );
            log.record(notification, DeliveryOutcome::Failed, Some(err.reason));
        }
    }
}

/// Transport that keeps everything in memory, for tests and local runs.
pub struct InMemoryNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .clone()
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for InMemoryNotifier {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification.clone());
        Ok(())
    }
}

/// Transport that refuses every message, for exercising the best-effort path.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        Err(DeliveryError {
            recipient: notification.recipient.clone(),
            reason: "transport unavailable".to_string(),
        })
    }
}

pub struct InMemoryTaskSink {
    tasks: Mutex<Vec<ReminderTask>>,
}

impl InMemoryTaskSink {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn tasks(&self) -> Vec<ReminderTask> {
        self.tasks.lock().expect("task sink mutex poisoned").clone()
    }
}

impl Default for InMemoryTaskSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSink for InMemoryTaskSink {
    fn push(&self, task: ReminderTask) {
        self.tasks
            .lock()
            .expect("task sink mutex poisoned")
            .push(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_logs_success() {
        let notifier = InMemoryNotifier::new();
        let log = DeliveryLog::new();
        let message = Notification::new("lan@example.com", "Done", "Your document is complete.");

        notify_best_effort(&notifier, &log, &message);

        assert_eq!(notifier.delivered().len(), 1);
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, DeliveryOutcome::Sent);
        assert!(entries[0].failure_reason.is_none());
    }

    #[test]
    fn best_effort_swallows_transport_failure() {
        let notifier = FailingNotifier;
        let log = DeliveryLog::new();
        let message = Notification::new("lan@example.com", "Done", "Your document is complete.");

        // Must not panic or propagate.
        notify_best_effort(&notifier, &log, &message);

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, DeliveryOutcome::Failed);
        assert_eq!(
            entries[0].failure_reason.as_deref(),
            Some("transport unavailable")
        );
    }
}
