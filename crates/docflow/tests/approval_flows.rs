mod common;

use common::{date, harness, outgoing_draft};
use docflow::error::DomainError;
use docflow::registry::domain::{ApprovalVariant, OutgoingStatus};
use docflow::workflow::{
    ApprovalFlow, ApprovalStep, ApproverSelector, PostApprovalAction,
};

fn contract_flow() -> ApprovalFlow {
    ApprovalFlow {
        id: "contract-large".to_string(),
        name: "Large contract sign-off".to_string(),
        sequence: 10,
        type_code: "HD".to_string(),
        active: true,
        min_value: 1_000,
        max_value: 0,
        expected_duration_hours: Some(72),
        steps: vec![
            ApprovalStep {
                sequence: 1,
                name: "unit review".to_string(),
                selector: ApproverSelector::ByUnit("Legal".to_string()),
                required: true,
                allow_reject: true,
                duration_hours: Some(48),
                post_approval: PostApprovalAction::Notify,
            },
            ApprovalStep {
                sequence: 2,
                name: "director sign-off".to_string(),
                selector: ApproverSelector::ByTitle("Director".to_string()),
                required: true,
                allow_reject: true,
                duration_hours: Some(24),
                post_approval: PostApprovalAction::Complete,
            },
        ],
    }
}

#[test]
fn configured_flow_walks_to_approved_and_then_sent() {
    let h = harness();
    h.flows.register(contract_flow());

    let mut draft = outgoing_draft("HD/0001/2025", ApprovalVariant::DualTier);
    draft.type_code = "HD".to_string();
    let document = h.registry.create_outgoing(draft).expect("drafted");
    h.registry
        .submit_outgoing(document.id, "minh", date(2025, 5, 1))
        .expect("submitted");
    h.registry
        .attach_signature(document.id, "Nguyen Van A", None, None)
        .expect("attached");
    h.registry.sign_outgoing(document.id).expect("signed");

    let after_first = h
        .registry
        .advance_flow(document.id, 5_000, "legal", date(2025, 5, 2))
        .expect("first step");
    assert_eq!(after_first.status, OutgoingStatus::PendingApproval);
    // Notify step reports progress to the drafter.
    assert!(h
        .notifier
        .delivered()
        .iter()
        .any(|n| n.recipient == "minh" && n.subject.contains("unit review")));

    let approved = h
        .registry
        .advance_flow(document.id, 5_000, "director", date(2025, 5, 3))
        .expect("final step");
    assert_eq!(approved.status, OutgoingStatus::Approved);
    assert!(approved.signed_flag);

    let sent = h
        .registry
        .mark_sent(document.id, date(2025, 5, 4))
        .expect("dispatched");
    assert_eq!(sent.status, OutgoingStatus::Sent);
    assert!(h
        .tasks
        .tasks()
        .iter()
        .any(|t| t.summary.contains("Confirm receipt") && t.due_date == date(2025, 5, 7)));
}

#[test]
fn final_step_requires_a_usable_signature() {
    let h = harness();
    h.flows.register(contract_flow());

    let mut draft = outgoing_draft("HD/0002/2025", ApprovalVariant::DualTier);
    draft.type_code = "HD".to_string();
    let document = h.registry.create_outgoing(draft).expect("drafted");
    h.registry
        .submit_outgoing(document.id, "minh", date(2025, 5, 1))
        .expect("submitted");

    h.registry
        .advance_flow(document.id, 5_000, "legal", date(2025, 5, 2))
        .expect("first step needs no signature");
    let err = h
        .registry
        .advance_flow(document.id, 5_000, "director", date(2025, 5, 3))
        .expect_err("unsigned document cannot finish the flow");
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(
        h.registry.fetch_outgoing(document.id).expect("present").status,
        OutgoingStatus::PendingApproval
    );
}

#[test]
fn value_outside_every_band_finds_no_flow() {
    let h = harness();
    h.flows.register(contract_flow());

    let mut draft = outgoing_draft("HD/0003/2025", ApprovalVariant::DualTier);
    draft.type_code = "HD".to_string();
    let document = h.registry.create_outgoing(draft).expect("drafted");
    h.registry
        .submit_outgoing(document.id, "minh", date(2025, 5, 1))
        .expect("submitted");

    let err = h
        .registry
        .advance_flow(document.id, 500, "legal", date(2025, 5, 2))
        .expect_err("value below the flow's floor");
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[test]
fn rejection_restarts_the_step_chain() {
    let h = harness();
    h.flows.register(contract_flow());

    let mut draft = outgoing_draft("HD/0004/2025", ApprovalVariant::DualTier);
    draft.type_code = "HD".to_string();
    let document = h.registry.create_outgoing(draft).expect("drafted");
    h.registry
        .submit_outgoing(document.id, "minh", date(2025, 5, 1))
        .expect("submitted");
    h.registry
        .attach_signature(document.id, "Nguyen Van A", None, None)
        .expect("attached");
    h.registry.sign_outgoing(document.id).expect("signed");

    h.registry
        .advance_flow(document.id, 5_000, "legal", date(2025, 5, 2))
        .expect("first step");
    h.registry
        .reject_outgoing(document.id, "director", None, date(2025, 5, 3))
        .expect("rejected");
    h.registry
        .submit_outgoing(document.id, "minh", date(2025, 5, 4))
        .expect("resubmitted");

    // The chain starts over: the next advance is the unit review again,
    // not the director sign-off, so the document stays pending.
    let after = h
        .registry
        .advance_flow(document.id, 5_000, "legal", date(2025, 5, 5))
        .expect("first step again");
    assert_eq!(after.status, OutgoingStatus::PendingApproval);
}
