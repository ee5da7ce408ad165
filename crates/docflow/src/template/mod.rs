use crate::error::DomainError;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Reusable boilerplate applied to outgoing drafts. The body carries
/// `{{name}}` placeholders filled from the subject document on application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub code: String,
    pub name: String,
    pub sequence: u32,
    pub type_code: String,
    pub body: String,
    #[serde(default)]
    pub guidance: Option<String>,
    pub active: bool,
}

impl DocumentTemplate {
    /// Substitutes every known placeholder; unknown placeholders stay in the
    /// text so the drafter sees what is still missing.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut rendered = self.body.clone();
        for (key, value) in values {
            rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
            rendered = rendered.replace(&format!("{{{{ {key} }}}}"), value);
        }
        rendered
    }
}

/// Per-template usage tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TemplateUsage {
    pub times_used: u32,
    pub last_used_at: Option<NaiveDateTime>,
}

#[derive(Default)]
struct TemplateInner {
    templates: HashMap<String, DocumentTemplate>,
    usage: HashMap<String, TemplateUsage>,
}

/// In-memory catalogue of document templates, keyed by code.
pub struct TemplateStore {
    inner: Mutex<TemplateInner>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TemplateInner::default()),
        }
    }

    pub fn register(&self, template: DocumentTemplate) -> Result<DocumentTemplate, DomainError> {
        let mut inner = self.inner.lock().expect("template mutex poisoned");
        if inner.templates.contains_key(&template.code) {
            return Err(DomainError::uniqueness(format!(
                "template code '{}' is already registered",
                template.code
            )));
        }
        inner
            .templates
            .insert(template.code.clone(), template.clone());
        Ok(template)
    }

    pub fn fetch(&self, code: &str) -> Result<DocumentTemplate, DomainError> {
        self.inner
            .lock()
            .expect("template mutex poisoned")
            .templates
            .get(code)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("template '{code}'")))
    }

    /// Active templates for a document type, in sequence order then by name.
    pub fn list_for_type(&self, type_code: &str) -> Vec<DocumentTemplate> {
        let inner = self.inner.lock().expect("template mutex poisoned");
        let mut templates: Vec<DocumentTemplate> = inner
            .templates
            .values()
            .filter(|t| t.active && t.type_code == type_code)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        templates
    }

    pub fn list(&self) -> Vec<DocumentTemplate> {
        let inner = self.inner.lock().expect("template mutex poisoned");
        let mut templates: Vec<DocumentTemplate> = inner.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        templates
    }

    pub fn record_use(&self, code: &str) {
        let mut inner = self.inner.lock().expect("template mutex poisoned");
        let usage = inner.usage.entry(code.to_string()).or_default();
        usage.times_used += 1;
        usage.last_used_at = Some(Utc::now().naive_utc());
    }

    pub fn usage(&self, code: &str) -> TemplateUsage {
        self.inner
            .lock()
            .expect("template mutex poisoned")
            .usage
            .get(code)
            .copied()
            .unwrap_or_default()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}
