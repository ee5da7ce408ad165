#![allow(dead_code)]

use chrono::NaiveDate;
use docflow::notify::{DeliveryLog, InMemoryNotifier, InMemoryTaskSink};
use docflow::registry::domain::ApprovalVariant;
use docflow::registry::incoming::IncomingDraft;
use docflow::registry::outgoing::OutgoingDraft;
use docflow::registry::sequence::SequenceGenerator;
use docflow::registry::service::DocumentRegistry;
use docflow::registry::store::{CustomerDirectory, MemoryCustomerDirectory, MemoryStore};
use docflow::signature::SignatureService;
use docflow::template::TemplateStore;
use docflow::versioning::VersionHistoryStore;
use docflow::workflow::{ApprovalTrail, FlowRegistry};
use std::sync::Arc;

pub struct Harness {
    pub registry: Arc<DocumentRegistry<MemoryStore, InMemoryNotifier, InMemoryTaskSink>>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<InMemoryNotifier>,
    pub tasks: Arc<InMemoryTaskSink>,
    pub deliveries: Arc<DeliveryLog>,
    pub customers: Arc<MemoryCustomerDirectory>,
    pub flows: Arc<FlowRegistry>,
    pub versions: Arc<VersionHistoryStore>,
    pub templates: Arc<TemplateStore>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let tasks = Arc::new(InMemoryTaskSink::new());
    let deliveries = Arc::new(DeliveryLog::new());
    let customers = Arc::new(MemoryCustomerDirectory::new());
    let flows = Arc::new(FlowRegistry::new());
    let versions = Arc::new(VersionHistoryStore::new());
    let templates = Arc::new(TemplateStore::new());
    let registry = Arc::new(DocumentRegistry::new(
        Arc::clone(&store),
        Arc::new(SequenceGenerator::new()),
        Arc::new(SignatureService::new(Arc::clone(&versions))),
        Arc::clone(&versions),
        Arc::new(ApprovalTrail::new()),
        Arc::clone(&flows),
        Arc::clone(&notifier),
        Arc::clone(&tasks),
        Arc::clone(&deliveries),
        Arc::clone(&customers) as Arc<dyn CustomerDirectory>,
        Arc::clone(&templates),
    ));

    Harness {
        registry,
        store,
        notifier,
        tasks,
        deliveries,
        customers,
        flows,
        versions,
        templates,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn incoming_draft(reference_code: &str) -> IncomingDraft {
    IncomingDraft {
        reference_code: reference_code.to_string(),
        received_date: date(2025, 3, 3),
        document_date: date(2025, 3, 1),
        issuing_party: "Provincial office".to_string(),
        subject: "Budget request".to_string(),
        type_code: "CV".to_string(),
        urgency: None,
        sensitivity: None,
        assignee: None,
        due_date: None,
        attachment: None,
        customer_id: None,
        source: None,
        note: None,
        created_by: "clerk".to_string(),
    }
}

pub fn outgoing_draft(reference_code: &str, variant: ApprovalVariant) -> OutgoingDraft {
    OutgoingDraft {
        reference_code: reference_code.to_string(),
        document_date: date(2025, 4, 1),
        recipient: "Acme Co".to_string(),
        subject: "Service agreement".to_string(),
        type_code: "CV-DI".to_string(),
        variant,
        urgency: None,
        sensitivity: None,
        drafter: Some("minh".to_string()),
        drafting_unit: Some("Sales".to_string()),
        approver_head: Some("head".to_string()),
        approver_director: Some("director".to_string()),
        signer_name: Some("Nguyen Van A".to_string()),
        attachment: None,
        reply_to: None,
        contract_id: None,
        opportunity: None,
        customer_id: None,
        note: None,
        created_by: "clerk".to_string(),
    }
}
