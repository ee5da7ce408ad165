use crate::error::DomainError;
use crate::registry::domain::{
    CustomerCard, DocumentId, DocumentType, IncomingDocument, OutgoingDocument, SourceLink,
};
use chrono::Datelike;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Persistence seam for registered documents and their types.
///
/// Updates run a caller closure against the stored record under the store's
/// own synchronization, so a read-validate-write sequence is atomic: either
/// the closure succeeds and the mutation lands, or it fails and the record
/// is unchanged.
pub trait DocumentStore: Send + Sync {
    fn insert_incoming(&self, document: IncomingDocument) -> Result<(), DomainError>;
    fn insert_outgoing(&self, document: OutgoingDocument) -> Result<(), DomainError>;

    fn fetch_incoming(&self, id: DocumentId) -> Result<IncomingDocument, DomainError>;
    fn fetch_outgoing(&self, id: DocumentId) -> Result<OutgoingDocument, DomainError>;

    fn update_incoming(
        &self,
        id: DocumentId,
        mutate: &mut dyn FnMut(&mut IncomingDocument) -> Result<(), DomainError>,
    ) -> Result<IncomingDocument, DomainError>;

    fn update_outgoing(
        &self,
        id: DocumentId,
        mutate: &mut dyn FnMut(&mut OutgoingDocument) -> Result<(), DomainError>,
    ) -> Result<OutgoingDocument, DomainError>;

    fn list_incoming(&self) -> Vec<IncomingDocument>;
    fn list_outgoing(&self) -> Vec<OutgoingDocument>;

    fn find_incoming_by_source(&self, source: &SourceLink) -> Option<IncomingDocument>;
    fn incoming_count_for_type_in_year(&self, type_code: &str, year: i32) -> u32;

    /// Creates the type if its code is unknown; existing types are returned
    /// as-is, so repeated calls are safe.
    fn ensure_type(&self, document_type: DocumentType) -> DocumentType;
    fn fetch_type(&self, code: &str) -> Result<DocumentType, DomainError>;
}

/// Lookup seam for the customer registry collaborator.
pub trait CustomerDirectory: Send + Sync {
    fn find(&self, customer_id: &str) -> Option<CustomerCard>;
}

#[derive(Default)]
struct StoreInner {
    incoming: HashMap<DocumentId, IncomingDocument>,
    outgoing: HashMap<DocumentId, OutgoingDocument>,
    types: HashMap<String, DocumentType>,
    // Reference codes across both directions; enforces global uniqueness.
    codes: HashSet<String>,
}

/// In-memory store used by the service and by tests.
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn insert_incoming(&self, document: IncomingDocument) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.codes.contains(&document.reference_code) {
            return Err(DomainError::uniqueness(format!(
                "reference code '{}' is already registered",
                document.reference_code
            )));
        }
        if let Some(source) = &document.source {
            let duplicate = inner
                .incoming
                .values()
                .any(|doc| doc.source.as_ref() == Some(source));
            if duplicate {
                return Err(DomainError::uniqueness(format!(
                    "source record {}:{} already has an incoming document",
                    source.kind.type_descriptor().0,
                    source.id
                )));
            }
        }
        inner.codes.insert(document.reference_code.clone());
        inner.incoming.insert(document.id, document);
        Ok(())
    }

    fn insert_outgoing(&self, document: OutgoingDocument) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.codes.contains(&document.reference_code) {
            return Err(DomainError::uniqueness(format!(
                "reference code '{}' is already registered",
                document.reference_code
            )));
        }
        inner.codes.insert(document.reference_code.clone());
        inner.outgoing.insert(document.id, document);
        Ok(())
    }

    fn fetch_incoming(&self, id: DocumentId) -> Result<IncomingDocument, DomainError> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .incoming
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("incoming document {id}")))
    }

    fn fetch_outgoing(&self, id: DocumentId) -> Result<OutgoingDocument, DomainError> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .outgoing
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("outgoing document {id}")))
    }

    fn update_incoming(
        &self,
        id: DocumentId,
        mutate: &mut dyn FnMut(&mut IncomingDocument) -> Result<(), DomainError>,
    ) -> Result<IncomingDocument, DomainError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let stored = inner
            .incoming
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("incoming document {id}")))?;
        let mut candidate = stored.clone();
        mutate(&mut candidate)?;
        *stored = candidate.clone();
        Ok(candidate)
    }

    fn update_outgoing(
        &self,
        id: DocumentId,
        mutate: &mut dyn FnMut(&mut OutgoingDocument) -> Result<(), DomainError>,
    ) -> Result<OutgoingDocument, DomainError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let stored = inner
            .outgoing
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("outgoing document {id}")))?;
        let mut candidate = stored.clone();
        mutate(&mut candidate)?;
        *stored = candidate.clone();
        Ok(candidate)
    }

    fn list_incoming(&self) -> Vec<IncomingDocument> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut documents: Vec<IncomingDocument> = inner.incoming.values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        documents
    }

    fn list_outgoing(&self) -> Vec<OutgoingDocument> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut documents: Vec<OutgoingDocument> = inner.outgoing.values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        documents
    }

    fn find_incoming_by_source(&self, source: &SourceLink) -> Option<IncomingDocument> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .incoming
            .values()
            .find(|doc| doc.source.as_ref() == Some(source))
            .cloned()
    }

    fn incoming_count_for_type_in_year(&self, type_code: &str, year: i32) -> u32 {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .incoming
            .values()
            .filter(|doc| doc.type_code == type_code && doc.received_date.year() == year)
            .count() as u32
    }

    fn ensure_type(&self, document_type: DocumentType) -> DocumentType {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .types
            .entry(document_type.code.clone())
            .or_insert(document_type)
            .clone()
    }

    fn fetch_type(&self, code: &str) -> Result<DocumentType, DomainError> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .types
            .get(code)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("document type '{code}'")))
    }
}

/// In-memory customer directory for tests and local runs.
pub struct MemoryCustomerDirectory {
    cards: Mutex<HashMap<String, CustomerCard>>,
}

impl MemoryCustomerDirectory {
    pub fn new() -> Self {
        Self {
            cards: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, card: CustomerCard) {
        self.cards
            .lock()
            .expect("directory mutex poisoned")
            .insert(card.id.clone(), card);
    }
}

impl Default for MemoryCustomerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerDirectory for MemoryCustomerDirectory {
    fn find(&self, customer_id: &str) -> Option<CustomerCard> {
        self.cards
            .lock()
            .expect("directory mutex poisoned")
            .get(customer_id)
            .cloned()
    }
}
