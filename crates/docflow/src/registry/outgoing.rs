use crate::error::DomainError;
use crate::registry::domain::{
    ApprovalVariant, AttachmentMeta, OpportunityLink, OutgoingAction, OutgoingDocument,
    OutgoingStatus, Sensitivity, Urgency,
};
use crate::registry::domain::DocumentId;
use crate::workflow;
use chrono::NaiveDate;
use serde::Deserialize;

/// Fields supplied when drafting an outgoing document.
#[derive(Debug, Clone, Deserialize)]
pub struct OutgoingDraft {
    pub reference_code: String,
    pub document_date: NaiveDate,
    pub recipient: String,
    pub subject: String,
    pub type_code: String,
    pub variant: ApprovalVariant,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub sensitivity: Option<Sensitivity>,
    #[serde(default)]
    pub drafter: Option<String>,
    #[serde(default)]
    pub drafting_unit: Option<String>,
    #[serde(default)]
    pub approver_head: Option<String>,
    #[serde(default)]
    pub approver_director: Option<String>,
    #[serde(default)]
    pub signer_name: Option<String>,
    #[serde(default)]
    pub attachment: Option<AttachmentMeta>,
    #[serde(default)]
    pub reply_to: Option<DocumentId>,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub opportunity: Option<OpportunityLink>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_by: String,
}

/// Applies one approval-lifecycle action in place. The caller runs this under
/// the store's update closure, so a returned error means nothing changed.
///
/// Signature preconditions for the single-signer path live in the registry
/// service, which can see the signature store; this function only enforces
/// status and variant legality.
pub fn apply(
    document: &mut OutgoingDocument,
    action: OutgoingAction,
    today: NaiveDate,
) -> Result<(), DomainError> {
    if document.status.is_terminal() {
        return Err(DomainError::state(action.label(), document.status.label()));
    }

    match action {
        OutgoingAction::Submit => {
            if document.status != OutgoingStatus::Draft {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.status = OutgoingStatus::PendingApproval;
        }
        OutgoingAction::ApproveHead => {
            require_variant(document, action, ApprovalVariant::DualTier)?;
            require_pending(document, action)?;
            if document.head_approved {
                return Err(DomainError::validation(
                    "department head has already approved this document",
                ));
            }
            document.head_approved = true;
            document.head_approved_on = Some(today);
            finish_if_complete(document, today);
        }
        OutgoingAction::ApproveDirector => {
            require_variant(document, action, ApprovalVariant::DualTier)?;
            require_pending(document, action)?;
            if document.director_approved {
                return Err(DomainError::validation(
                    "the director has already approved this document",
                ));
            }
            document.director_approved = true;
            document.director_approved_on = Some(today);
            finish_if_complete(document, today);
        }
        OutgoingAction::ApproveSingle => {
            require_variant(document, action, ApprovalVariant::SingleSigner)?;
            require_pending(document, action)?;
            document.signed_flag = true;
            document.signed_date = Some(today);
            document.send_date = Some(today);
            document.status = OutgoingStatus::Sent;
        }
        OutgoingAction::Reject => {
            // Rejecting a draft is a no-op that lands back on draft.
            if !matches!(
                document.status,
                OutgoingStatus::Draft | OutgoingStatus::PendingApproval
            ) {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.head_approved = false;
            document.head_approved_on = None;
            document.director_approved = false;
            document.director_approved_on = None;
            document.status = OutgoingStatus::Draft;
        }
        OutgoingAction::MarkSent => {
            if document.status != OutgoingStatus::Approved {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.send_date = Some(today);
            document.status = OutgoingStatus::Sent;
        }
        OutgoingAction::Cancel => {
            if !matches!(
                document.status,
                OutgoingStatus::Draft | OutgoingStatus::PendingApproval | OutgoingStatus::Approved
            ) {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.status = OutgoingStatus::Cancelled;
        }
    }
    Ok(())
}

fn require_pending(
    document: &OutgoingDocument,
    action: OutgoingAction,
) -> Result<(), DomainError> {
    if document.status != OutgoingStatus::PendingApproval {
        return Err(DomainError::state(action.label(), document.status.label()));
    }
    Ok(())
}

fn require_variant(
    document: &OutgoingDocument,
    action: OutgoingAction,
    expected: ApprovalVariant,
) -> Result<(), DomainError> {
    if document.variant != expected {
        return Err(DomainError::validation(format!(
            "action '{}' applies to {} documents, this one is {}",
            action.label(),
            expected.label(),
            document.variant.label()
        )));
    }
    Ok(())
}

/// Completion is evaluated inside the same mutation as the approval that may
/// have finished the pair, so no observer can see both flags set while the
/// status still reads pending.
fn finish_if_complete(document: &mut OutgoingDocument, today: NaiveDate) {
    if workflow::check_completion(document) {
        document.signed_flag = true;
        document.signed_date = Some(today);
        document.status = OutgoingStatus::Completed;
    }
}
