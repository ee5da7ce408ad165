mod common;

use common::{date, harness, outgoing_draft};
use docflow::error::DomainError;
use docflow::registry::domain::{ApprovalVariant, DocumentKind, SubjectRef};
use docflow::template::DocumentTemplate;

fn contract_template() -> DocumentTemplate {
    DocumentTemplate {
        code: "HD-STD".to_string(),
        name: "Standard contract letter".to_string(),
        sequence: 10,
        type_code: "CV-DI".to_string(),
        body: "To {{recipient}}: please find contract {{reference_code}} dated {{document_date}}."
            .to_string(),
        guidance: None,
        active: true,
    }
}

#[test]
fn applying_a_template_fills_the_draft_body_and_records_a_version() {
    let h = harness();
    h.templates.register(contract_template()).expect("registered");

    let document = h
        .registry
        .create_outgoing(outgoing_draft("CV-DI/0001/2025", ApprovalVariant::DualTier))
        .expect("drafted");

    let updated = h
        .registry
        .apply_template(document.id, "HD-STD", "minh")
        .expect("template applied");
    assert_eq!(
        updated.note.as_deref(),
        Some("To Acme Co: please find contract CV-DI/0001/2025 dated 01/04/2025.")
    );

    let versions = h
        .versions
        .list(&SubjectRef::new(DocumentKind::Outgoing, document.id));
    assert_eq!(versions.len(), 2, "draft plus the template application");
    assert_eq!(
        versions[1].change_note,
        "applied template 'Standard contract letter'"
    );
    assert_eq!(h.templates.usage("HD-STD").times_used, 1);
}

#[test]
fn templates_only_apply_to_drafts() {
    let h = harness();
    h.templates.register(contract_template()).expect("registered");

    let document = h
        .registry
        .create_outgoing(outgoing_draft("CV-DI/0002/2025", ApprovalVariant::DualTier))
        .expect("drafted");
    h.registry
        .submit_outgoing(document.id, "minh", date(2025, 4, 1))
        .expect("submitted");

    let err = h
        .registry
        .apply_template(document.id, "HD-STD", "minh")
        .expect_err("pending documents keep their body");
    assert!(matches!(err, DomainError::State { .. }));
}

#[test]
fn inactive_and_unknown_templates_are_rejected() {
    let h = harness();
    let mut retired = contract_template();
    retired.active = false;
    h.templates.register(retired).expect("registered");

    let document = h
        .registry
        .create_outgoing(outgoing_draft("CV-DI/0003/2025", ApprovalVariant::DualTier))
        .expect("drafted");

    let err = h
        .registry
        .apply_template(document.id, "HD-STD", "minh")
        .expect_err("inactive template");
    assert!(matches!(err, DomainError::Validation(_)));

    let err = h
        .registry
        .apply_template(document.id, "NO-SUCH", "minh")
        .expect_err("unknown template");
    assert!(matches!(err, DomainError::NotFound(_)));
}
