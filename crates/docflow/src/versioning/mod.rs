use crate::error::DomainError;
use crate::registry::domain::{ContentSnapshot, SubjectRef};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::HashMap;
use std::sync::Mutex;

/// One immutable snapshot of a document's mutable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub subject_ref: SubjectRef,
    pub number: u32,
    pub content: ContentSnapshot,
    pub change_note: String,
    pub recorded_by: String,
    pub recorded_at: NaiveDateTime,
}

/// Outcome of comparing two snapshots of the same subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DiffResult {
    /// Line-level unified diff of the two content blobs.
    Unified(String),
    /// Comparison could not be produced; the message says why.
    Unavailable(String),
}

/// Per-subject version history. Version numbers are gap-free and start at 1;
/// the next number is computed under the same lock that appends, so two
/// concurrent snapshots of one subject cannot collide.
pub struct VersionHistoryStore {
    histories: Mutex<HashMap<SubjectRef, Vec<DocumentVersion>>>,
}

impl VersionHistoryStore {
    pub fn new() -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a snapshot and returns the recorded version.
    pub fn create_version(
        &self,
        subject_ref: SubjectRef,
        content: ContentSnapshot,
        change_note: impl Into<String>,
        recorded_by: impl Into<String>,
    ) -> DocumentVersion {
        let mut histories = self.histories.lock().expect("version mutex poisoned");
        let history = histories.entry(subject_ref).or_default();
        let version = DocumentVersion {
            subject_ref,
            number: history.len() as u32 + 1,
            content,
            change_note: change_note.into(),
            recorded_by: recorded_by.into(),
            recorded_at: Utc::now().naive_utc(),
        };
        history.push(version.clone());
        version
    }

    /// Versions for a subject in recording order.
    pub fn list(&self, subject_ref: &SubjectRef) -> Vec<DocumentVersion> {
        self.histories
            .lock()
            .expect("version mutex poisoned")
            .get(subject_ref)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get(&self, subject_ref: &SubjectRef, number: u32) -> Result<DocumentVersion, DomainError> {
        self.histories
            .lock()
            .expect("version mutex poisoned")
            .get(subject_ref)
            .and_then(|history| history.iter().find(|v| v.number == number))
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "version {number} of {} {}",
                    subject_ref.kind.label(),
                    subject_ref.id
                ))
            })
    }

    /// Unified diff between two versions of the same subject. Missing
    /// versions produce an explanatory placeholder rather than an error.
    pub fn diff(&self, subject_ref: &SubjectRef, from: u32, to: u32) -> DiffResult {
        let older = match self.get(subject_ref, from) {
            Ok(version) => version,
            Err(_) => return DiffResult::Unavailable(format!("version {from} does not exist")),
        };
        let newer = match self.get(subject_ref, to) {
            Ok(version) => version,
            Err(_) => return DiffResult::Unavailable(format!("version {to} does not exist")),
        };
        diff_snapshots(&older.content, &newer.content)
    }
}

impl Default for VersionHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn render(content: &ContentSnapshot) -> String {
    match &content.note {
        Some(note) => format!("{}\n{}\n", content.subject, note),
        None => format!("{}\n", content.subject),
    }
}

fn diff_snapshots(older: &ContentSnapshot, newer: &ContentSnapshot) -> DiffResult {
    let before = render(older);
    let after = render(newer);
    if before == after {
        return DiffResult::Unavailable("versions have identical content".to_string());
    }
    let diff = TextDiff::from_lines(&before, &after);
    DiffResult::Unified(
        diff.unified_diff()
            .context_radius(3)
            .header("before", "after")
            .to_string(),
    )
}
