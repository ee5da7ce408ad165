use crate::config::SchedulerConfig;
use crate::error::DomainError;
use crate::notify::{notify_best_effort, DeliveryLog, Notification, Notifier};
use crate::registry::domain::{IncomingStatus, OutgoingStatus};
use crate::registry::store::DocumentStore;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Tally of what one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub overdue_marked: usize,
    pub due_warnings: usize,
    pub draft_reminders: usize,
    pub approval_reminders: usize,
}

/// Periodic escalation over the document registry.
///
/// Sweeps only escalate: they mark overdue, warn, and remind, but never
/// complete, approve, or cancel a document. A run lock ensures overlapping
/// triggers skip instead of double-reminding.
pub struct Sweeper<S: DocumentStore, N: Notifier> {
    store: Arc<S>,
    notifier: Arc<N>,
    deliveries: Arc<DeliveryLog>,
    config: SchedulerConfig,
    run_guard: Mutex<()>,
}

impl<S: DocumentStore, N: Notifier> Sweeper<S, N> {
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        deliveries: Arc<DeliveryLog>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            deliveries,
            config,
            run_guard: Mutex::new(()),
        }
    }

    /// Runs every sweep once. Returns `None` when another run holds the
    /// lock.
    pub fn run(&self, today: NaiveDate) -> Option<SweepReport> {
        let _guard = match self.run_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!("sweep already running, skipping this trigger");
                return None;
            }
        };

        let mut report = SweepReport::default();
        self.sweep_overdue(today, &mut report);
        self.sweep_approaching_due(today, &mut report);
        self.sweep_stalled_outgoing(today, &mut report);
        info!(
            overdue = report.overdue_marked,
            warnings = report.due_warnings,
            draft_reminders = report.draft_reminders,
            approval_reminders = report.approval_reminders,
            "sweep finished"
        );
        Some(report)
    }

    /// Incoming documents past their deadline become overdue, including
    /// forwarded ones still awaiting a reply. Only done documents are out of
    /// scope; already-overdue ones stay put.
    fn sweep_overdue(&self, today: NaiveDate, report: &mut SweepReport) {
        for document in self.store.list_incoming() {
            let past_due = !matches!(
                document.status,
                IncomingStatus::Done | IncomingStatus::Overdue
            ) && document.due_date.is_some_and(|due| due < today);
            if !past_due {
                continue;
            }

            let outcome = self.store.update_incoming(document.id, &mut |record| {
                if matches!(
                    record.status,
                    IncomingStatus::Done | IncomingStatus::Overdue
                ) {
                    // Someone completed it since we listed.
                    return Err(DomainError::state("mark_overdue", record.status.label()));
                }
                record.status = IncomingStatus::Overdue;
                Ok(())
            });

            match outcome {
                Ok(updated) => {
                    report.overdue_marked += 1;
                    if let Some(assignee) = &updated.assignee {
                        notify_best_effort(
                            self.notifier.as_ref(),
                            &self.deliveries,
                            &Notification::new(
                                assignee.clone(),
                                format!("Document {} is overdue", updated.reference_code),
                                format!(
                                    "'{}' passed its deadline on {}.",
                                    updated.subject,
                                    updated.due_date.map(|d| d.to_string()).unwrap_or_default()
                                ),
                            ),
                        );
                    }
                }
                Err(DomainError::State { .. }) => {}
                Err(err) => warn!(error = %err, "overdue sweep skipped a document"),
            }
        }
    }

    /// Warns assignees whose deadline falls inside the warning window. One
    /// warning per document per day.
    fn sweep_approaching_due(&self, today: NaiveDate, report: &mut SweepReport) {
        let horizon = today + Duration::days(self.config.expiry_warning_days);
        for document in self.store.list_incoming() {
            let in_window = matches!(
                document.status,
                IncomingStatus::New | IncomingStatus::InProgress
            ) && document
                .due_date
                .is_some_and(|due| due >= today && due <= horizon);
            if !in_window || document.last_reminded_on == Some(today) {
                continue;
            }

            let outcome = self.store.update_incoming(document.id, &mut |record| {
                if record.last_reminded_on == Some(today) {
                    return Err(DomainError::validation("already reminded today"));
                }
                record.last_reminded_on = Some(today);
                Ok(())
            });

            if let Ok(updated) = outcome {
                report.due_warnings += 1;
                let recipient = updated
                    .assignee
                    .clone()
                    .unwrap_or_else(|| updated.created_by.clone());
                notify_best_effort(
                    self.notifier.as_ref(),
                    &self.deliveries,
                    &Notification::new(
                        recipient,
                        format!("Document {} is due soon", updated.reference_code),
                        format!(
                            "'{}' is due on {}.",
                            updated.subject,
                            updated.due_date.map(|d| d.to_string()).unwrap_or_default()
                        ),
                    ),
                );
            }
        }
    }

    /// Chases outgoing documents stuck in draft or pending approval past the
    /// configured lead times. Status never changes; only reminders go out.
    fn sweep_stalled_outgoing(&self, today: NaiveDate, report: &mut SweepReport) {
        for document in self.store.list_outgoing() {
            let age_days = (today - document.created_at.date()).num_days();
            let stalled = match document.status {
                OutgoingStatus::Draft => age_days >= self.config.draft_reminder_days,
                OutgoingStatus::PendingApproval => {
                    age_days >= self.config.approval_reminder_days
                        || (document.signature_id.is_none()
                            && age_days >= self.config.sign_reminder_days)
                }
                _ => false,
            };
            if !stalled || document.last_reminded_on == Some(today) {
                continue;
            }

            let outcome = self.store.update_outgoing(document.id, &mut |record| {
                if record.last_reminded_on == Some(today) {
                    return Err(DomainError::validation("already reminded today"));
                }
                record.last_reminded_on = Some(today);
                Ok(())
            });

            if let Ok(updated) = outcome {
                let (counter, recipient, subject) = match updated.status {
                    OutgoingStatus::Draft => (
                        &mut report.draft_reminders,
                        updated.drafter.clone().unwrap_or_else(|| updated.created_by.clone()),
                        format!("Draft {} is waiting on you", updated.reference_code),
                    ),
                    _ => (
                        &mut report.approval_reminders,
                        updated
                            .approver_head
                            .clone()
                            .or_else(|| updated.signer_name.clone())
                            .unwrap_or_else(|| updated.created_by.clone()),
                        format!("Document {} awaits approval", updated.reference_code),
                    ),
                };
                *counter += 1;
                notify_best_effort(
                    self.notifier.as_ref(),
                    &self.deliveries,
                    &Notification::new(
                        recipient,
                        subject,
                        format!("'{}' has seen no progress for {age_days} days.", updated.subject),
                    ),
                );
            }
        }
    }
}
