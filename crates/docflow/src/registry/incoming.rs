use crate::error::DomainError;
use crate::registry::domain::{
    AttachmentMeta, IncomingAction, IncomingDocument, IncomingStatus, Sensitivity, SourceLink,
    Urgency,
};
use chrono::NaiveDate;
use serde::Deserialize;

/// Fields supplied when registering an incoming document. Everything the
/// engine derives (id, status, timestamps) is filled in by the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingDraft {
    pub reference_code: String,
    pub received_date: NaiveDate,
    pub document_date: NaiveDate,
    pub issuing_party: String,
    pub subject: String,
    pub type_code: String,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub sensitivity: Option<Sensitivity>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub attachment: Option<AttachmentMeta>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub source: Option<SourceLink>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_by: String,
}

/// Parameters for a transition on an incoming document. Assignment carries
/// the assignee and deadline; the other actions ignore them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingTransition {
    pub action: IncomingAction,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl Default for IncomingAction {
    fn default() -> Self {
        Self::Assign
    }
}

/// Applies one lifecycle action in place. Validation failures leave the
/// document untouched because callers run this inside the store's update
/// closure.
pub fn apply(
    document: &mut IncomingDocument,
    transition: &IncomingTransition,
    today: NaiveDate,
) -> Result<(), DomainError> {
    let action = transition.action;
    match action {
        IncomingAction::Assign => {
            if !matches!(
                document.status,
                IncomingStatus::New | IncomingStatus::Overdue
            ) {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            let assignee = transition
                .assignee
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| DomainError::validation("assignment requires an assignee"))?;
            let due_date = transition
                .due_date
                .ok_or_else(|| DomainError::validation("assignment requires a due date"))?;
            document.assignee = Some(assignee.to_string());
            document.due_date = Some(due_date);
            document.status = IncomingStatus::InProgress;
        }
        IncomingAction::ApproveAssignment => {
            if document.status != IncomingStatus::InProgress {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            if document.assignee.is_none() || document.due_date.is_none() {
                return Err(DomainError::validation(
                    "approval requires an assignee and a due date",
                ));
            }
            document.signed_flag = true;
            document.signed_date = Some(today);
        }
        IncomingAction::Reject => {
            if !matches!(
                document.status,
                IncomingStatus::InProgress | IncomingStatus::Overdue
            ) {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.assignee = None;
            document.signed_flag = false;
            document.signed_date = None;
            document.status = IncomingStatus::New;
        }
        IncomingAction::Complete => {
            // The only route to done; the overdue sweep never completes
            // a document on its own.
            if !matches!(
                document.status,
                IncomingStatus::InProgress | IncomingStatus::Overdue
            ) {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.status = IncomingStatus::Done;
        }
        IncomingAction::Forward => {
            if matches!(
                document.status,
                IncomingStatus::Done | IncomingStatus::Forwarded
            ) {
                return Err(DomainError::state(action.label(), document.status.label()));
            }
            document.status = IncomingStatus::Forwarded;
        }
    }
    Ok(())
}
