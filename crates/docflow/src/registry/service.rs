use crate::error::DomainError;
use crate::linkage::{self, SourceSubmission, StageProposal};
use crate::notify::{notify_best_effort, DeliveryLog, Notification, Notifier, ReminderTask, TaskSink};
use crate::registry::domain::{
    ApprovalVariant, ContentSnapshot, DocumentId, DocumentKind, IncomingAction, IncomingDocument,
    IncomingStatus, OutgoingAction, OutgoingDocument, OutgoingStatus, Sensitivity, SubjectRef,
    Urgency,
};
use crate::registry::incoming::{self, IncomingDraft, IncomingTransition};
use crate::registry::outgoing::{self, OutgoingDraft};
use crate::registry::sequence::SequenceGenerator;
use crate::registry::store::{CustomerDirectory, DocumentStore};
use crate::signature::{Signature, SignatureId, SignatureService};
use crate::template::TemplateStore;
use crate::versioning::{DocumentVersion, VersionHistoryStore};
use crate::workflow::{ApprovalAction, ApprovalRole, ApprovalTrail, FlowRegistry, PostApprovalAction};
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

/// Days an approver gets before the chase task created at submission fires.
const APPROVAL_TASK_LEAD_DAYS: i64 = 1;
/// Days after dispatch before the delivery-confirmation task fires.
const DELIVERY_FOLLOW_UP_DAYS: i64 = 3;

/// Orchestrates the document lifecycle over the persistence and delivery
/// seams. One instance is shared across the HTTP surface and the scheduler.
pub struct DocumentRegistry<S, N, T>
where
    S: DocumentStore,
    N: Notifier,
    T: TaskSink,
{
    store: Arc<S>,
    sequence: Arc<SequenceGenerator>,
    signatures: Arc<SignatureService>,
    versions: Arc<VersionHistoryStore>,
    trail: Arc<ApprovalTrail>,
    flows: Arc<FlowRegistry>,
    notifier: Arc<N>,
    tasks: Arc<T>,
    deliveries: Arc<DeliveryLog>,
    customers: Arc<dyn CustomerDirectory>,
    templates: Arc<TemplateStore>,
}

impl<S, N, T> DocumentRegistry<S, N, T>
where
    S: DocumentStore,
    N: Notifier,
    T: TaskSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<S>,
        sequence: Arc<SequenceGenerator>,
        signatures: Arc<SignatureService>,
        versions: Arc<VersionHistoryStore>,
        trail: Arc<ApprovalTrail>,
        flows: Arc<FlowRegistry>,
        notifier: Arc<N>,
        tasks: Arc<T>,
        deliveries: Arc<DeliveryLog>,
        customers: Arc<dyn CustomerDirectory>,
        templates: Arc<TemplateStore>,
    ) -> Self {
        Self {
            store,
            sequence,
            signatures,
            versions,
            trail,
            flows,
            notifier,
            tasks,
            deliveries,
            customers,
            templates,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn signatures(&self) -> &SignatureService {
        &self.signatures
    }

    pub fn versions(&self) -> &VersionHistoryStore {
        &self.versions
    }

    pub fn trail(&self) -> &ApprovalTrail {
        &self.trail
    }

    pub fn flows(&self) -> &FlowRegistry {
        &self.flows
    }

    pub fn deliveries(&self) -> &DeliveryLog {
        &self.deliveries
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    // ---- incoming ----------------------------------------------------

    pub fn create_incoming(&self, draft: IncomingDraft) -> Result<IncomingDocument, DomainError> {
        let reference_code = non_blank(&draft.reference_code, "reference code")?;
        let subject = non_blank(&draft.subject, "subject")?;

        let mut document = IncomingDocument {
            id: DocumentId::new(),
            reference_code,
            received_date: draft.received_date,
            document_date: draft.document_date,
            issuing_party: draft.issuing_party.trim().to_string(),
            contact_phone: None,
            contact_email: None,
            subject,
            type_code: draft.type_code.trim().to_string(),
            urgency: draft.urgency.unwrap_or(Urgency::Normal),
            sensitivity: draft.sensitivity.unwrap_or(Sensitivity::Normal),
            assignee: draft.assignee,
            due_date: draft.due_date,
            signed_flag: false,
            signed_date: None,
            status: IncomingStatus::New,
            attachment: draft.attachment,
            customer_id: draft.customer_id,
            source: draft.source,
            note: draft.note,
            last_reminded_on: None,
            created_by: draft.created_by,
            created_at: Utc::now().naive_utc(),
        };
        self.fill_contacts_from_customer(
            document.customer_id.as_deref(),
            &mut document.contact_phone,
            &mut document.contact_email,
        );
        if document.issuing_party.is_empty() {
            if let Some(customer_id) = document.customer_id.as_deref() {
                if let Some(card) = self.customers.find(customer_id) {
                    document.issuing_party = card.name;
                }
            }
        }

        self.store.insert_incoming(document.clone())?;
        self.versions.create_version(
            SubjectRef::new(DocumentKind::Incoming, document.id),
            document.content_snapshot(),
            "registered",
            document.created_by.clone(),
        );
        if let Some(due) = document.due_date {
            self.tasks.push(ReminderTask {
                summary: format!("Process incoming document {}", document.reference_code),
                assignee: document.assignee.clone(),
                due_date: due,
            });
        }
        info!(code = %document.reference_code, "incoming document registered");
        Ok(document)
    }

    pub fn transition_incoming(
        &self,
        id: DocumentId,
        transition: IncomingTransition,
        today: NaiveDate,
    ) -> Result<IncomingDocument, DomainError> {
        let updated = self.store.update_incoming(id, &mut |document| {
            incoming::apply(document, &transition, today)
        })?;
        if transition.action == IncomingAction::ApproveAssignment {
            if let Some(due) = updated.due_date {
                self.tasks.push(ReminderTask {
                    summary: format!("Handle approved document {}", updated.reference_code),
                    assignee: updated.assignee.clone(),
                    due_date: due,
                });
            }
        }
        info!(
            code = %updated.reference_code,
            action = transition.action.label(),
            status = updated.status.label(),
            "incoming document transitioned"
        );
        Ok(updated)
    }

    pub fn fetch_incoming(&self, id: DocumentId) -> Result<IncomingDocument, DomainError> {
        self.store.fetch_incoming(id)
    }

    pub fn list_incoming(&self) -> Vec<IncomingDocument> {
        self.store.list_incoming()
    }

    // ---- outgoing ----------------------------------------------------

    pub fn create_outgoing(&self, draft: OutgoingDraft) -> Result<OutgoingDocument, DomainError> {
        let reference_code = non_blank(&draft.reference_code, "reference code")?;
        let subject = non_blank(&draft.subject, "subject")?;
        let recipient = non_blank(&draft.recipient, "recipient")?;

        let mut document = OutgoingDocument {
            id: DocumentId::new(),
            reference_code,
            document_date: draft.document_date,
            send_date: None,
            recipient,
            contact_phone: None,
            contact_email: None,
            signer_name: draft.signer_name,
            subject,
            type_code: draft.type_code.trim().to_string(),
            urgency: draft.urgency.unwrap_or(Urgency::Normal),
            sensitivity: draft.sensitivity.unwrap_or(Sensitivity::Normal),
            drafter: draft.drafter,
            drafting_unit: draft.drafting_unit,
            variant: draft.variant,
            approver_head: draft.approver_head,
            approver_director: draft.approver_director,
            head_approved: false,
            head_approved_on: None,
            director_approved: false,
            director_approved_on: None,
            status: OutgoingStatus::Draft,
            signed_flag: false,
            signed_date: None,
            attachment: draft.attachment,
            signature_id: None,
            reply_to: draft.reply_to,
            contract_id: draft.contract_id,
            opportunity: draft.opportunity,
            customer_id: draft.customer_id,
            note: draft.note,
            last_reminded_on: None,
            created_by: draft.created_by,
            created_at: Utc::now().naive_utc(),
        };
        self.fill_contacts_from_customer(
            document.customer_id.as_deref(),
            &mut document.contact_phone,
            &mut document.contact_email,
        );

        self.store.insert_outgoing(document.clone())?;
        self.versions.create_version(
            SubjectRef::new(DocumentKind::Outgoing, document.id),
            document.content_snapshot(),
            "drafted",
            document.created_by.clone(),
        );
        info!(code = %document.reference_code, "outgoing document drafted");
        Ok(document)
    }

    pub fn submit_outgoing(
        &self,
        id: DocumentId,
        actor: &str,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let updated = self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::Submit, today)
        })?;
        self.trail.log(
            id,
            actor,
            ApprovalRole::Other,
            ApprovalAction::Note,
            Some("submitted for approval".to_string()),
        );
        let chaser = match updated.variant {
            ApprovalVariant::DualTier => updated.approver_head.clone(),
            ApprovalVariant::SingleSigner => updated.signer_name.clone(),
        };
        self.tasks.push(ReminderTask {
            summary: format!("Review outgoing document {}", updated.reference_code),
            assignee: chaser,
            due_date: today + Duration::days(APPROVAL_TASK_LEAD_DAYS),
        });
        info!(code = %updated.reference_code, "outgoing document submitted");
        Ok(updated)
    }

    pub fn approve_head(
        &self,
        id: DocumentId,
        actor: &str,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let updated = self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::ApproveHead, today)
        })?;
        self.trail
            .log(id, actor, ApprovalRole::Head, ApprovalAction::Approve, None);
        self.after_approval(&updated, today);
        Ok(updated)
    }

    pub fn approve_director(
        &self,
        id: DocumentId,
        actor: &str,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let updated = self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::ApproveDirector, today)
        })?;
        self.trail.log(
            id,
            actor,
            ApprovalRole::Director,
            ApprovalAction::Approve,
            None,
        );
        self.after_approval(&updated, today);
        Ok(updated)
    }

    /// Single-signer approval. The attached signature must already be signed
    /// or verified; the precondition is checked here because the state
    /// machine cannot see the signature store.
    pub fn approve_single(
        &self,
        id: DocumentId,
        actor: &str,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let current = self.store.fetch_outgoing(id)?;
        let signature_id = current.signature_id.ok_or_else(|| {
            DomainError::validation("document must be signed before approval")
        })?;
        let signature = self.signatures.fetch(signature_id)?;
        if !signature.status.is_usable() {
            return Err(DomainError::validation(
                "document must be signed before approval",
            ));
        }

        let updated = self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::ApproveSingle, today)
        })?;
        self.trail
            .log(id, actor, ApprovalRole::Other, ApprovalAction::Sign, None);

        // A reply that reaches dispatch closes out the incoming document it
        // answers. A document that already moved on is left as it is.
        if let Some(reply_to) = updated.reply_to {
            let _ = self.store.update_incoming(reply_to, &mut |document| {
                incoming::apply(
                    document,
                    &IncomingTransition {
                        action: IncomingAction::Complete,
                        ..Default::default()
                    },
                    today,
                )
            });
        }

        self.after_approval(&updated, today);
        Ok(updated)
    }

    pub fn reject_outgoing(
        &self,
        id: DocumentId,
        actor: &str,
        comment: Option<String>,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let updated = self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::Reject, today)
        })?;
        self.trail
            .log(id, actor, ApprovalRole::Other, ApprovalAction::Reject, comment);
        info!(code = %updated.reference_code, "outgoing document rejected back to draft");
        Ok(updated)
    }

    pub fn cancel_outgoing(
        &self,
        id: DocumentId,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::Cancel, today)
        })
    }

    pub fn mark_sent(
        &self,
        id: DocumentId,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let updated = self.store.update_outgoing(id, &mut |document| {
            outgoing::apply(document, OutgoingAction::MarkSent, today)
        })?;
        self.tasks.push(ReminderTask {
            summary: format!("Confirm receipt of {}", updated.reference_code),
            assignee: updated.drafter.clone(),
            due_date: today + Duration::days(DELIVERY_FOLLOW_UP_DAYS),
        });
        Ok(updated)
    }

    pub fn fetch_outgoing(&self, id: DocumentId) -> Result<OutgoingDocument, DomainError> {
        self.store.fetch_outgoing(id)
    }

    pub fn list_outgoing(&self) -> Vec<OutgoingDocument> {
        self.store.list_outgoing()
    }

    // ---- configured approval flows -----------------------------------

    /// Approves the next pending step of the configured flow matching the
    /// document's type and value. Steps completed before the most recent
    /// rejection do not count; a rejection restarts the chain.
    pub fn advance_flow(
        &self,
        id: DocumentId,
        value: i64,
        actor: &str,
        today: NaiveDate,
    ) -> Result<OutgoingDocument, DomainError> {
        let document = self.store.fetch_outgoing(id)?;
        if document.status != OutgoingStatus::PendingApproval {
            return Err(DomainError::state("advance_flow", document.status.label()));
        }
        let flow = self
            .flows
            .select_flow(&document.type_code, value)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "approval flow for type '{}' and value {value}",
                    document.type_code
                ))
            })?;
        let steps = flow.ordered_steps();
        let completed = self.flow_steps_completed(id);
        let step = *steps.get(completed).ok_or_else(|| {
            DomainError::validation("the approval flow has no further steps")
        })?;
        let is_last = completed + 1 == steps.len();

        self.trail.log(
            id,
            actor,
            ApprovalRole::Other,
            ApprovalAction::Approve,
            Some(format!("step '{}'", step.name)),
        );

        if step.post_approval == PostApprovalAction::Notify {
            if let Some(drafter) = &document.drafter {
                notify_best_effort(
                    self.notifier.as_ref(),
                    &self.deliveries,
                    &Notification::new(
                        drafter.clone(),
                        format!("Step '{}' approved on {}", step.name, document.reference_code),
                        format!("'{}' moved forward in its approval flow.", document.subject),
                    ),
                );
            }
        }

        if step.post_approval == PostApprovalAction::Complete || is_last {
            let signature_ok = match document.signature_id {
                Some(signature_id) => self.signatures.fetch(signature_id)?.status.is_usable(),
                None => false,
            };
            if !signature_ok {
                return Err(DomainError::validation(
                    "document must be signed before approval",
                ));
            }
            let updated = self.store.update_outgoing(id, &mut |record| {
                if record.status != OutgoingStatus::PendingApproval {
                    return Err(DomainError::state("advance_flow", record.status.label()));
                }
                record.status = OutgoingStatus::Approved;
                record.signed_flag = true;
                record.signed_date = Some(today);
                Ok(())
            })?;
            info!(code = %updated.reference_code, flow = %flow.name, "approval flow completed");
            return Ok(updated);
        }

        self.store.fetch_outgoing(id)
    }

    fn flow_steps_completed(&self, id: DocumentId) -> usize {
        let entries = self.trail.entries_for(id);
        let since = entries
            .iter()
            .rposition(|entry| entry.action == ApprovalAction::Reject)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        entries[since..]
            .iter()
            .filter(|entry| {
                entry.role == ApprovalRole::Other
                    && entry.action == ApprovalAction::Approve
                    && entry
                        .comment
                        .as_deref()
                        .is_some_and(|c| c.starts_with("step "))
            })
            .count()
    }

    // ---- signatures --------------------------------------------------

    /// Creates a draft signature over the document's current content and
    /// links it to the outgoing document. The content digest is fixed here;
    /// later edits do not move it.
    pub fn attach_signature(
        &self,
        id: DocumentId,
        signer_name: &str,
        signer_title: Option<String>,
        signature_image_ref: Option<String>,
    ) -> Result<Signature, DomainError> {
        let signer = non_blank(signer_name, "signer name")?;
        let document = self.store.fetch_outgoing(id)?;
        if document.status.is_terminal() {
            return Err(DomainError::state("attach_signature", document.status.label()));
        }
        let signature = self.signatures.create(
            SubjectRef::new(DocumentKind::Outgoing, id),
            signer,
            signer_title,
            &rendered_content(&document),
            signature_image_ref,
        );
        let signature_id = signature.id;
        self.store.update_outgoing(id, &mut |record| {
            record.signature_id = Some(signature_id);
            Ok(())
        })?;
        Ok(signature)
    }

    /// Signs the attached signature and snapshots the signed content.
    pub fn sign_outgoing(&self, id: DocumentId) -> Result<Signature, DomainError> {
        let document = self.store.fetch_outgoing(id)?;
        let signature_id = document
            .signature_id
            .ok_or_else(|| DomainError::validation("no signature attached to this document"))?;
        self.signatures
            .sign(signature_id, document.content_snapshot())
    }

    pub fn verify_signature(&self, id: SignatureId) -> Result<Signature, DomainError> {
        self.signatures.verify(id)
    }

    pub fn revoke_signature(
        &self,
        id: SignatureId,
        reason: &str,
    ) -> Result<Signature, DomainError> {
        self.signatures.revoke(id, reason)
    }

    // ---- versions ----------------------------------------------------

    /// Records an edit to a document's content as a new version.
    pub fn record_edit(
        &self,
        subject_ref: SubjectRef,
        snapshot: ContentSnapshot,
        change_note: &str,
        actor: &str,
    ) -> Result<DocumentVersion, DomainError> {
        self.apply_snapshot(subject_ref, &snapshot)?;
        Ok(self
            .versions
            .create_version(subject_ref, snapshot, change_note, actor))
    }

    /// Rewrites the document's content from an older version and records the
    /// restoration itself as a new version.
    pub fn restore_version(
        &self,
        subject_ref: SubjectRef,
        number: u32,
        actor: &str,
    ) -> Result<DocumentVersion, DomainError> {
        let version = self.versions.get(&subject_ref, number)?;
        self.apply_snapshot(subject_ref, &version.content)?;
        Ok(self.versions.create_version(
            subject_ref,
            version.content,
            format!("restored from version {number}"),
            actor,
        ))
    }

    fn apply_snapshot(
        &self,
        subject_ref: SubjectRef,
        snapshot: &ContentSnapshot,
    ) -> Result<(), DomainError> {
        match subject_ref.kind {
            DocumentKind::Incoming => {
                self.store.update_incoming(subject_ref.id, &mut |record| {
                    record.subject = snapshot.subject.clone();
                    record.note = snapshot.note.clone();
                    Ok(())
                })?;
            }
            DocumentKind::Outgoing => {
                self.store.update_outgoing(subject_ref.id, &mut |record| {
                    record.subject = snapshot.subject.clone();
                    record.note = snapshot.note.clone();
                    Ok(())
                })?;
            }
            other => {
                return Err(DomainError::validation(format!(
                    "content of '{}' records is managed elsewhere",
                    other.label()
                )))
            }
        }
        Ok(())
    }

    // ---- templates ---------------------------------------------------

    /// Renders an active template over a draft's fields and writes the
    /// result into the document body. The application is itself a version,
    /// so the drafter can diff or roll it back.
    pub fn apply_template(
        &self,
        id: DocumentId,
        template_code: &str,
        actor: &str,
    ) -> Result<OutgoingDocument, DomainError> {
        let template = self.templates.fetch(template_code)?;
        if !template.active {
            return Err(DomainError::validation(format!(
                "template '{}' is inactive",
                template.code
            )));
        }

        let document = self.store.fetch_outgoing(id)?;
        let mut values = std::collections::HashMap::from([
            ("reference_code".to_string(), document.reference_code.clone()),
            ("recipient".to_string(), document.recipient.clone()),
            ("subject".to_string(), document.subject.clone()),
            (
                "document_date".to_string(),
                document.document_date.format("%d/%m/%Y").to_string(),
            ),
        ]);
        if let Some(contract_id) = &document.contract_id {
            values.insert("contract_id".to_string(), contract_id.clone());
        }
        if let Some(customer_id) = document.customer_id.as_deref() {
            if let Some(card) = self.customers.find(customer_id) {
                values.insert("customer".to_string(), card.name);
            }
        }
        let rendered = template.render(&values);

        let updated = self.store.update_outgoing(id, &mut |record| {
            if record.status != OutgoingStatus::Draft {
                return Err(DomainError::state("apply_template", record.status.label()));
            }
            record.note = Some(rendered.clone());
            Ok(())
        })?;
        self.templates.record_use(&template.code);
        self.versions.create_version(
            SubjectRef::new(DocumentKind::Outgoing, id),
            updated.content_snapshot(),
            format!("applied template '{}'", template.name),
            actor,
        );
        info!(
            code = %updated.reference_code,
            template = %template.code,
            "template applied to draft"
        );
        Ok(updated)
    }

    // ---- cross-document linkage --------------------------------------

    pub fn register_source_submission(
        &self,
        submission: &SourceSubmission,
        today: NaiveDate,
    ) -> Result<IncomingDocument, DomainError> {
        linkage::ensure_incoming_for(
            self.store.as_ref(),
            &self.sequence,
            self.tasks.as_ref(),
            submission,
            today,
        )
    }

    // ---- shared tails ------------------------------------------------

    /// Completion side effects shared by every approval path: tell the
    /// drafter and the customer, and raise a stage proposal for any linked
    /// opportunity. All of it is best effort.
    fn after_approval(&self, document: &OutgoingDocument, today: NaiveDate) -> Option<StageProposal> {
        if !matches!(
            document.status,
            OutgoingStatus::Completed | OutgoingStatus::Sent | OutgoingStatus::Approved
        ) {
            return None;
        }

        if let Some(drafter) = &document.drafter {
            notify_best_effort(
                self.notifier.as_ref(),
                &self.deliveries,
                &Notification::new(
                    drafter.clone(),
                    format!("Document {} approved", document.reference_code),
                    format!("'{}' finished its approval.", document.subject),
                ),
            );
        }
        if let Some(email) = &document.contact_email {
            notify_best_effort(
                self.notifier.as_ref(),
                &self.deliveries,
                &Notification::new(
                    email.clone(),
                    format!("Regarding {}", document.reference_code),
                    format!("'{}' has been approved and is on its way.", document.subject),
                ),
            );
        }

        let type_name = self
            .store
            .fetch_type(&document.type_code)
            .map(|t| t.name)
            .unwrap_or_else(|_| document.type_code.clone());
        linkage::propose_opportunity_stage_advance(
            document,
            &type_name,
            self.tasks.as_ref(),
            today,
        )
    }

    fn fill_contacts_from_customer(
        &self,
        customer_id: Option<&str>,
        phone: &mut Option<String>,
        email: &mut Option<String>,
    ) {
        let Some(customer_id) = customer_id else {
            return;
        };
        if let Some(card) = self.customers.find(customer_id) {
            if phone.is_none() {
                *phone = card.phone;
            }
            if email.is_none() {
                *email = card.email;
            }
        }
    }
}

fn rendered_content(document: &OutgoingDocument) -> String {
    match &document.note {
        Some(note) => format!("{}\n{}", document.subject, note),
        None => document.subject.clone(),
    }
}

fn non_blank(value: &str, field: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}
