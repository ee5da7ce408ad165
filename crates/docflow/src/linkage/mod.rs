use crate::error::DomainError;
use crate::notify::{ReminderTask, TaskSink};
use crate::registry::domain::{
    DocumentId, DocumentType, IncomingDocument, IncomingStatus, OpportunityStage,
    OutgoingDocument, Sensitivity, SourceLink, Urgency,
};
use crate::registry::sequence::SequenceGenerator;
use crate::registry::store::DocumentStore;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Days granted for processing a document spawned from a business record.
const LINKED_PROCESSING_DAYS: i64 = 3;

/// Details of a business-record submission that should register an incoming
/// document. The source link is the idempotency key: a record submitted
/// twice yields the same document.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSubmission {
    pub source: SourceLink,
    pub counterparty: String,
    pub subject: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub submitted_by: String,
}

/// Registers the incoming document for a submitted business record, creating
/// the matching document type on demand. Safe to call repeatedly.
pub fn ensure_incoming_for<S: DocumentStore>(
    store: &S,
    sequence: &SequenceGenerator,
    tasks: &dyn TaskSink,
    submission: &SourceSubmission,
    today: NaiveDate,
) -> Result<IncomingDocument, DomainError> {
    if let Some(existing) = store.find_incoming_by_source(&submission.source) {
        return Ok(existing);
    }

    let (type_code, type_name) = submission.source.kind.type_descriptor();
    store.ensure_type(DocumentType {
        code: type_code.to_string(),
        name: type_name.to_string(),
        description: format!("Auto-created for {type_name} submissions"),
        active: true,
    });

    let year = today.year();
    sequence.seed(
        type_code,
        year,
        store.incoming_count_for_type_in_year(type_code, year),
    );
    let reference_code = sequence.next_code(type_code, year);
    let due_date = today + Duration::days(LINKED_PROCESSING_DAYS);

    let document = IncomingDocument {
        id: DocumentId::new(),
        reference_code,
        received_date: today,
        document_date: today,
        issuing_party: submission.counterparty.clone(),
        contact_phone: None,
        contact_email: None,
        subject: submission.subject.clone(),
        type_code: type_code.to_string(),
        urgency: Urgency::Normal,
        sensitivity: Sensitivity::Normal,
        assignee: None,
        due_date: Some(due_date),
        signed_flag: false,
        signed_date: None,
        status: IncomingStatus::New,
        attachment: None,
        customer_id: submission.customer_id.clone(),
        source: Some(submission.source.clone()),
        note: submission.note.clone(),
        last_reminded_on: None,
        created_by: submission.submitted_by.clone(),
        created_at: Utc::now().naive_utc(),
    };

    match store.insert_incoming(document.clone()) {
        Ok(()) => {
            tasks.push(ReminderTask {
                summary: format!(
                    "Process {} '{}' by {}",
                    type_name.to_ascii_lowercase(),
                    document.reference_code,
                    due_date
                ),
                assignee: None,
                due_date,
            });
            info!(code = %document.reference_code, "incoming document registered for source record");
            Ok(document)
        }
        // A concurrent submission of the same record won the race; its
        // document is the canonical one.
        Err(DomainError::Uniqueness(_)) => store
            .find_incoming_by_source(&submission.source)
            .ok_or_else(|| {
                DomainError::uniqueness(format!(
                    "source record {}:{} collided without a registered document",
                    type_code, submission.source.id
                ))
            }),
        Err(err) => Err(err),
    }
}

/// A suggested stage move for the sales opportunity linked to an outgoing
/// document. Proposals are advisory: the engine records a follow-up task and
/// leaves the opportunity untouched until a person confirms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProposal {
    pub opportunity_id: String,
    pub from: OpportunityStage,
    pub to: OpportunityStage,
    pub reason: String,
}

/// Evaluates the stage-advance heuristic after an outgoing document finishes
/// its approval. Quotation paperwork nudges a quoting opportunity toward
/// negotiation; contract paperwork nudges a negotiating opportunity to won.
pub fn propose_opportunity_stage_advance(
    document: &OutgoingDocument,
    type_name: &str,
    tasks: &dyn TaskSink,
    today: NaiveDate,
) -> Option<StageProposal> {
    let opportunity = document.opportunity.as_ref()?;
    let lowered = type_name.to_ascii_lowercase();

    let (to, reason) = if lowered.contains("quotation") && opportunity.stage == OpportunityStage::Quoting
    {
        (
            OpportunityStage::Negotiation,
            format!("quotation '{}' was approved", document.reference_code),
        )
    } else if lowered.contains("contract") && opportunity.stage == OpportunityStage::Negotiation {
        (
            OpportunityStage::Won,
            format!("contract '{}' was approved", document.reference_code),
        )
    } else {
        return None;
    };

    let proposal = StageProposal {
        opportunity_id: opportunity.id.clone(),
        from: opportunity.stage,
        to,
        reason,
    };
    tasks.push(ReminderTask {
        summary: format!(
            "Confirm stage change for opportunity '{}': {} -> {}",
            opportunity.name,
            proposal.from.label(),
            proposal.to.label()
        ),
        assignee: opportunity.owner.clone(),
        due_date: today,
    });
    Some(proposal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::InMemoryTaskSink;
    use crate::registry::domain::{ApprovalVariant, OpportunityLink, OutgoingStatus, SourceKind};
    use crate::registry::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn submission(kind: SourceKind, id: &str) -> SourceSubmission {
        SourceSubmission {
            source: SourceLink {
                kind,
                id: id.to_string(),
            },
            counterparty: "Acme Co".to_string(),
            subject: "Signed contract paperwork".to_string(),
            customer_id: Some("KH-1".to_string()),
            note: None,
            submitted_by: "sales".to_string(),
        }
    }

    #[test]
    fn first_submission_registers_a_document() {
        let store = MemoryStore::new();
        let sequence = SequenceGenerator::new();
        let tasks = InMemoryTaskSink::new();
        let today = date(2025, 6, 2);

        let document = ensure_incoming_for(
            &store,
            &sequence,
            &tasks,
            &submission(SourceKind::Contract, "C-1"),
            today,
        )
        .expect("registration succeeds");

        assert_eq!(document.reference_code, "HD/0001/2025");
        assert_eq!(document.due_date, Some(date(2025, 6, 5)));
        assert_eq!(document.status, IncomingStatus::New);
        assert!(store.fetch_type("HD").is_ok());
        assert_eq!(tasks.tasks().len(), 1);
    }

    #[test]
    fn resubmission_returns_the_same_document() {
        let store = MemoryStore::new();
        let sequence = SequenceGenerator::new();
        let tasks = InMemoryTaskSink::new();
        let today = date(2025, 6, 2);
        let request = submission(SourceKind::Quotation, "Q-9");

        let first =
            ensure_incoming_for(&store, &sequence, &tasks, &request, today).expect("first");
        let second =
            ensure_incoming_for(&store, &sequence, &tasks, &request, today).expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(store.list_incoming().len(), 1);
        assert_eq!(tasks.tasks().len(), 1, "no duplicate follow-up task");
    }

    #[test]
    fn counters_are_independent_per_source_kind() {
        let store = MemoryStore::new();
        let sequence = SequenceGenerator::new();
        let tasks = InMemoryTaskSink::new();
        let today = date(2025, 6, 2);

        let contract = ensure_incoming_for(
            &store,
            &sequence,
            &tasks,
            &submission(SourceKind::Contract, "C-1"),
            today,
        )
        .expect("contract");
        let request = ensure_incoming_for(
            &store,
            &sequence,
            &tasks,
            &submission(SourceKind::CustomerRequest, "R-1"),
            today,
        )
        .expect("request");

        assert_eq!(contract.reference_code, "HD/0001/2025");
        assert_eq!(request.reference_code, "YC/0001/2025");
    }

    fn outgoing_with_opportunity(stage: OpportunityStage) -> OutgoingDocument {
        OutgoingDocument {
            id: DocumentId::new(),
            reference_code: "BG/0005/2025".to_string(),
            document_date: date(2025, 6, 2),
            send_date: None,
            recipient: "Acme Co".to_string(),
            contact_phone: None,
            contact_email: None,
            signer_name: None,
            subject: "Quotation".to_string(),
            type_code: "BG".to_string(),
            urgency: Urgency::Normal,
            sensitivity: Sensitivity::Normal,
            drafter: None,
            drafting_unit: None,
            variant: ApprovalVariant::SingleSigner,
            approver_head: None,
            approver_director: None,
            head_approved: false,
            head_approved_on: None,
            director_approved: false,
            director_approved_on: None,
            status: OutgoingStatus::Sent,
            signed_flag: true,
            signed_date: Some(date(2025, 6, 2)),
            attachment: None,
            signature_id: None,
            reply_to: None,
            contract_id: None,
            opportunity: Some(OpportunityLink {
                id: "OP-3".to_string(),
                name: "Acme rollout".to_string(),
                stage,
                owner: Some("lan".to_string()),
            }),
            customer_id: Some("KH-1".to_string()),
            note: None,
            last_reminded_on: None,
            created_by: "sales".to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn quotation_approval_proposes_negotiation() {
        let tasks = InMemoryTaskSink::new();
        let document = outgoing_with_opportunity(OpportunityStage::Quoting);

        let proposal =
            propose_opportunity_stage_advance(&document, "Quotation", &tasks, date(2025, 6, 2))
                .expect("heuristic fires");

        assert_eq!(proposal.from, OpportunityStage::Quoting);
        assert_eq!(proposal.to, OpportunityStage::Negotiation);
        let queued = tasks.tasks();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].assignee.as_deref(), Some("lan"));
    }

    #[test]
    fn contract_approval_proposes_won_only_from_negotiation() {
        let tasks = InMemoryTaskSink::new();
        let negotiating = outgoing_with_opportunity(OpportunityStage::Negotiation);
        let proposal =
            propose_opportunity_stage_advance(&negotiating, "Contract", &tasks, date(2025, 6, 2))
                .expect("heuristic fires");
        assert_eq!(proposal.to, OpportunityStage::Won);

        let already_won = outgoing_with_opportunity(OpportunityStage::Won);
        assert!(propose_opportunity_stage_advance(
            &already_won,
            "Contract",
            &tasks,
            date(2025, 6, 2)
        )
        .is_none());
    }

    #[test]
    fn no_opportunity_means_no_proposal() {
        let tasks = InMemoryTaskSink::new();
        let mut document = outgoing_with_opportunity(OpportunityStage::Quoting);
        document.opportunity = None;
        assert!(propose_opportunity_stage_advance(
            &document,
            "Quotation",
            &tasks,
            date(2025, 6, 2)
        )
        .is_none());
        assert!(tasks.tasks().is_empty());
    }
}
