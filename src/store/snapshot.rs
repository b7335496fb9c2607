//! Read results: single-document and query snapshots.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{from_document, Document};
use crate::error::StoreError;

/// A document read at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    id: String,
    fields: Document,
}

impl DocumentSnapshot {
    pub(crate) fn new(id: String, fields: Document) -> Self {
        DocumentSnapshot { id, fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserialize the fields into a typed model.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        from_document(self.fields.clone())
    }

    pub fn into_fields(self) -> Document {
        self.fields
    }
}

/// The ordered result set of a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySnapshot {
    docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub(crate) fn new(docs: Vec<DocumentSnapshot>) -> Self {
        QuerySnapshot { docs }
    }

    pub fn docs(&self) -> &[DocumentSnapshot] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentSnapshot> {
        self.docs.iter()
    }
}

impl<'a> IntoIterator for &'a QuerySnapshot {
    type Item = &'a DocumentSnapshot;
    type IntoIter = std::slice::Iter<'a, DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}
