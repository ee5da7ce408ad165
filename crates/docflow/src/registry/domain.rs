use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for registered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Correspondence category, created on demand by cross-document linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub code: String,
    pub name: String,
    pub description: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Urgent,
    Express,
    MostUrgent,
}

impl Urgency {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Urgent => "Urgent",
            Self::Express => "Express",
            Self::MostUrgent => "Most Urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Normal,
    Confidential,
    TopSecret,
}

impl Sensitivity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Confidential => "Confidential",
            Self::TopSecret => "Top Secret",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingStatus {
    New,
    InProgress,
    Overdue,
    Done,
    Forwarded,
}

impl IncomingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Overdue => "overdue",
            Self::Done => "done",
            Self::Forwarded => "forwarded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutgoingStatus {
    Draft,
    PendingApproval,
    Approved,
    Sent,
    Completed,
    Cancelled,
}

impl OutgoingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Sent => "sent",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed, sent, and cancelled documents accept no further actions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Sent | Self::Cancelled)
    }
}

/// Selects which transition set is legal for an outgoing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalVariant {
    /// Department-head plus director sign-off before completion.
    DualTier,
    /// One signer approves and dispatches in a single step.
    SingleSigner,
}

impl ApprovalVariant {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DualTier => "dual_tier",
            Self::SingleSigner => "single_signer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingAction {
    Assign,
    ApproveAssignment,
    Reject,
    Complete,
    Forward,
}

impl IncomingAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::ApproveAssignment => "approve_assignment",
            Self::Reject => "reject",
            Self::Complete => "complete",
            Self::Forward => "forward",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutgoingAction {
    Submit,
    ApproveHead,
    ApproveDirector,
    ApproveSingle,
    Reject,
    MarkSent,
    Cancel,
}

impl OutgoingAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::ApproveHead => "approve_head",
            Self::ApproveDirector => "approve_director",
            Self::ApproveSingle => "approve_single",
            Self::Reject => "reject",
            Self::MarkSent => "mark_sent",
            Self::Cancel => "cancel",
        }
    }
}

/// Document kinds a signature or version snapshot can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Incoming,
    Outgoing,
    Contract,
    Quotation,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
            Self::Contract => "contract",
            Self::Quotation => "quotation",
        }
    }
}

/// Tagged polymorphic reference; always a kind plus an id, never a bare key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: DocumentKind,
    pub id: DocumentId,
}

impl SubjectRef {
    pub fn new(kind: DocumentKind, id: DocumentId) -> Self {
        Self { kind, id }
    }
}

/// Business records that spawn incoming documents on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Contract,
    Quotation,
    CustomerRequest,
}

impl SourceKind {
    /// Document-type code and display name used when the linked type is
    /// created on demand.
    pub const fn type_descriptor(self) -> (&'static str, &'static str) {
        match self {
            Self::Contract => ("HD", "Contract"),
            Self::Quotation => ("BG", "Quotation"),
            Self::CustomerRequest => ("YC", "Customer request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLink {
    pub kind: SourceKind,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStage {
    New,
    Qualified,
    Quoting,
    Negotiation,
    Won,
    Lost,
}

impl OpportunityStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Qualified => "qualified",
            Self::Quoting => "quoting",
            Self::Negotiation => "negotiation",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

/// Snapshot of the linked sales opportunity carried on an outgoing document.
/// The engine only reads it to build stage-advance proposals; the opportunity
/// record itself is owned elsewhere and never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityLink {
    pub id: String,
    pub name: String,
    pub stage: OpportunityStage,
    pub owner: Option<String>,
}

/// Attachment metadata only; file storage is an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Contact card served by the customer registry collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCard {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub owner: Option<String>,
}

/// Mutable content fields captured by version snapshots and rewritten on
/// restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub subject: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingDocument {
    pub id: DocumentId,
    pub reference_code: String,
    pub received_date: NaiveDate,
    pub document_date: NaiveDate,
    pub issuing_party: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub subject: String,
    pub type_code: String,
    pub urgency: Urgency,
    pub sensitivity: Sensitivity,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub signed_flag: bool,
    pub signed_date: Option<NaiveDate>,
    pub status: IncomingStatus,
    pub attachment: Option<AttachmentMeta>,
    pub customer_id: Option<String>,
    pub source: Option<SourceLink>,
    pub note: Option<String>,
    pub last_reminded_on: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingDocument {
    pub id: DocumentId,
    pub reference_code: String,
    pub document_date: NaiveDate,
    pub send_date: Option<NaiveDate>,
    pub recipient: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub signer_name: Option<String>,
    pub subject: String,
    pub type_code: String,
    pub urgency: Urgency,
    pub sensitivity: Sensitivity,
    pub drafter: Option<String>,
    pub drafting_unit: Option<String>,
    pub variant: ApprovalVariant,
    pub approver_head: Option<String>,
    pub approver_director: Option<String>,
    pub head_approved: bool,
    pub head_approved_on: Option<NaiveDate>,
    pub director_approved: bool,
    pub director_approved_on: Option<NaiveDate>,
    pub status: OutgoingStatus,
    pub signed_flag: bool,
    pub signed_date: Option<NaiveDate>,
    pub attachment: Option<AttachmentMeta>,
    pub signature_id: Option<crate::signature::SignatureId>,
    pub reply_to: Option<DocumentId>,
    pub contract_id: Option<String>,
    pub opportunity: Option<OpportunityLink>,
    pub customer_id: Option<String>,
    pub note: Option<String>,
    pub last_reminded_on: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

impl IncomingDocument {
    pub fn content_snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            subject: self.subject.clone(),
            note: self.note.clone(),
        }
    }
}

impl OutgoingDocument {
    pub fn content_snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            subject: self.subject.clone(),
            note: self.note.clone(),
        }
    }
}
