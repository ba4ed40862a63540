use indexmap::IndexMap;

/// Source of stored document fields (the index collaborator).
pub trait DocumentStore: Send + Sync {
    /// Text of `field` in document `doc_id`, `None` if either is missing.
    fn field_text(&self, doc_id: &str, field: &str) -> Option<&str>;
}

/// Document fields held in memory, keyed by document id then field name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: IndexMap<Box<str>, IndexMap<Box<str>, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) one field of one document.
    pub fn insert(&mut self, doc_id: &str, field: &str, text: impl Into<String>) {
        if !self.documents.contains_key(doc_id) {
            self.documents.insert(doc_id.into(), IndexMap::new());
        }
        if let Some(fields) = self.documents.get_mut(doc_id) {
            fields.insert(field.into(), text.into());
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn field_text(&self, doc_id: &str, field: &str) -> Option<&str> {
        self.documents
            .get(doc_id)
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
    }
}
