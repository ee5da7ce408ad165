use crate::registry::domain::{DocumentId, OutgoingDocument};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// How the approver for a step is resolved at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "value")]
pub enum ApproverSelector {
    /// Whoever currently holds the named job title.
    ByTitle(String),
    /// Anyone in the named unit.
    ByUnit(String),
    /// One specific person.
    Explicit(String),
}

/// What happens after a step is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostApprovalAction {
    /// Move on to the next step in sequence.
    Advance,
    /// Finish the whole flow; the document is approved.
    Complete,
    /// Move on like `Advance`, additionally telling the drafter about the
    /// progress.
    Notify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub sequence: u32,
    pub name: String,
    pub selector: ApproverSelector,
    pub required: bool,
    pub allow_reject: bool,
    pub duration_hours: Option<i64>,
    pub post_approval: PostApprovalAction,
}

/// A configurable chain of approval steps, optionally constrained to a
/// document value band. A flow with both bounds at zero applies to any value.
/// `sequence` orders flows against each other when several bands overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFlow {
    pub id: String,
    pub name: String,
    pub sequence: u32,
    pub type_code: String,
    pub active: bool,
    pub min_value: i64,
    pub max_value: i64,
    pub expected_duration_hours: Option<i64>,
    pub steps: Vec<ApprovalStep>,
}

impl ApprovalFlow {
    fn matches(&self, type_code: &str, value: i64) -> bool {
        if !self.active || self.type_code != type_code {
            return false;
        }
        if self.min_value <= 0 && self.max_value <= 0 {
            return true;
        }
        let above_floor = self.min_value <= 0 || value >= self.min_value;
        let below_ceiling = self.max_value <= 0 || value <= self.max_value;
        above_floor && below_ceiling
    }

    /// Steps in configured order regardless of insertion order.
    pub fn ordered_steps(&self) -> Vec<&ApprovalStep> {
        let mut steps: Vec<&ApprovalStep> = self.steps.iter().collect();
        steps.sort_by_key(|step| step.sequence);
        steps
    }
}

/// Registered approval flows, looked up by document type and value.
pub struct FlowRegistry {
    flows: Mutex<Vec<ApprovalFlow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self {
            flows: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, flow: ApprovalFlow) {
        self.flows.lock().expect("flow mutex poisoned").push(flow);
    }

    /// Picks the matching active flow with the lowest `sequence`. Among
    /// flows sharing a sequence, the one registered earlier wins.
    pub fn select_flow(&self, type_code: &str, value: i64) -> Option<ApprovalFlow> {
        self.flows
            .lock()
            .expect("flow mutex poisoned")
            .iter()
            .filter(|flow| flow.matches(type_code, value))
            .min_by_key(|flow| flow.sequence)
            .cloned()
    }
}

impl Default for FlowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRole {
    Head,
    Director,
    Other,
}

impl ApprovalRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Director => "director",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Sign,
    Reject,
    Note,
}

impl ApprovalAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Sign => "sign",
            Self::Reject => "reject",
            Self::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub document_id: DocumentId,
    pub actor: String,
    pub role: ApprovalRole,
    pub action: ApprovalAction,
    pub comment: Option<String>,
    pub recorded_at: NaiveDateTime,
}

/// Append-only audit log of approval decisions. Logging never fails and
/// entries are never edited or removed.
pub struct ApprovalTrail {
    entries: Mutex<HashMap<DocumentId, Vec<TrailEntry>>>,
}

impl ApprovalTrail {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn log(
        &self,
        document_id: DocumentId,
        actor: impl Into<String>,
        role: ApprovalRole,
        action: ApprovalAction,
        comment: Option<String>,
    ) {
        let entry = TrailEntry {
            document_id,
            actor: actor.into(),
            role,
            action,
            comment,
            recorded_at: Utc::now().naive_utc(),
        };
        self.entries
            .lock()
            .expect("trail mutex poisoned")
            .entry(document_id)
            .or_default()
            .push(entry);
    }

    pub fn entries_for(&self, document_id: DocumentId) -> Vec<TrailEntry> {
        self.entries
            .lock()
            .expect("trail mutex poisoned")
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for ApprovalTrail {
    fn default() -> Self {
        Self::new()
    }
}

/// A dual-tier document completes exactly when both sign-offs are present.
pub fn check_completion(document: &OutgoingDocument) -> bool {
    document.head_approved && document.director_approved
}
