mod common;

use common::{date, harness, incoming_draft};
use docflow::config::SchedulerConfig;
use docflow::error::DomainError;
use docflow::registry::domain::{CustomerCard, IncomingAction, IncomingStatus};
use docflow::registry::incoming::IncomingTransition;
use docflow::scheduler::Sweeper;
use std::sync::Arc;

fn assign(assignee: &str, due: chrono::NaiveDate) -> IncomingTransition {
    IncomingTransition {
        action: IncomingAction::Assign,
        assignee: Some(assignee.to_string()),
        due_date: Some(due),
        actor: None,
    }
}

#[test]
fn registration_rejects_blank_reference_code() {
    let h = harness();
    let mut draft = incoming_draft("  ");
    draft.reference_code = "   ".to_string();
    let err = h
        .registry
        .create_incoming(draft)
        .expect_err("blank code rejected");
    assert!(matches!(err, DomainError::Validation(_)));
}

#[test]
fn registration_fills_contacts_from_the_customer_card() {
    let h = harness();
    h.customers.insert(CustomerCard {
        id: "KH-1".to_string(),
        name: "Acme Co".to_string(),
        phone: Some("0901234567".to_string()),
        email: Some("contact@acme.example".to_string()),
        owner: None,
    });
    let mut draft = incoming_draft("CV/0001/2025");
    draft.customer_id = Some("KH-1".to_string());

    let document = h.registry.create_incoming(draft).expect("registered");
    assert_eq!(document.contact_phone.as_deref(), Some("0901234567"));
    assert_eq!(document.contact_email.as_deref(), Some("contact@acme.example"));
}

#[test]
fn registration_records_the_first_version_and_a_deadline_task() {
    let h = harness();
    let mut draft = incoming_draft("CV/0001/2025");
    draft.due_date = Some(date(2025, 3, 10));
    draft.assignee = Some("lan".to_string());

    let document = h.registry.create_incoming(draft).expect("registered");

    let versions = h.versions.list(&docflow::registry::domain::SubjectRef::new(
        docflow::registry::domain::DocumentKind::Incoming,
        document.id,
    ));
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].change_note, "registered");

    let tasks = h.tasks.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].due_date, date(2025, 3, 10));
}

#[test]
fn assignment_requires_assignee_and_due_date() {
    let h = harness();
    let document = h
        .registry
        .create_incoming(incoming_draft("CV/0001/2025"))
        .expect("registered");

    let err = h
        .registry
        .transition_incoming(
            document.id,
            IncomingTransition {
                action: IncomingAction::Assign,
                assignee: Some("lan".to_string()),
                due_date: None,
                actor: None,
            },
            date(2025, 3, 3),
        )
        .expect_err("missing due date");
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(
        h.registry.fetch_incoming(document.id).expect("present").status,
        IncomingStatus::New
    );
}

#[test]
fn missed_deadline_is_escalated_but_never_completed() {
    let h = harness();
    let document = h
        .registry
        .create_incoming(incoming_draft("CV/0001/2025"))
        .expect("registered");
    h.registry
        .transition_incoming(document.id, assign("lan", date(2025, 3, 10)), date(2025, 3, 3))
        .expect("assigned");

    let sweeper = Sweeper::new(
        Arc::clone(&h.store),
        Arc::clone(&h.notifier),
        Arc::clone(&h.deliveries),
        SchedulerConfig::default(),
    );
    let report = sweeper.run(date(2025, 3, 15)).expect("lock free");
    assert_eq!(report.overdue_marked, 1);

    let overdue = h.registry.fetch_incoming(document.id).expect("present");
    assert_eq!(overdue.status, IncomingStatus::Overdue);
    assert!(h
        .notifier
        .delivered()
        .iter()
        .any(|n| n.recipient == "lan" && n.subject.contains("overdue")));

    // The assignee still finishes the work explicitly.
    let done = h
        .registry
        .transition_incoming(
            document.id,
            IncomingTransition {
                action: IncomingAction::Complete,
                assignee: None,
                due_date: None,
                actor: None,
            },
            date(2025, 3, 16),
        )
        .expect("completed");
    assert_eq!(done.status, IncomingStatus::Done);

    // A later sweep leaves the finished document alone.
    let report = sweeper.run(date(2025, 3, 20)).expect("lock free");
    assert_eq!(report.overdue_marked, 0);
}

#[test]
fn forwarding_parks_the_document() {
    let h = harness();
    let document = h
        .registry
        .create_incoming(incoming_draft("CV/0002/2025"))
        .expect("registered");
    let forwarded = h
        .registry
        .transition_incoming(
            document.id,
            IncomingTransition {
                action: IncomingAction::Forward,
                assignee: None,
                due_date: None,
                actor: None,
            },
            date(2025, 3, 4),
        )
        .expect("forwarded");
    assert_eq!(forwarded.status, IncomingStatus::Forwarded);

    let err = h
        .registry
        .transition_incoming(
            document.id,
            assign("lan", date(2025, 3, 10)),
            date(2025, 3, 5),
        )
        .expect_err("forwarded documents are closed here");
    assert!(matches!(err, DomainError::State { .. }));
}
