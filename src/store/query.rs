//! Inert document, collection, and query descriptors.
//!
//! Descriptors perform no I/O; they are consumed by the operations on
//! [`Database`](super::Database). The guaranteed filter operator set is
//! equality only; sorting supports a single key with direction.

use std::cmp::Ordering;

use serde_json::Value;

use super::snapshot::DocumentSnapshot;
use super::Document;
use crate::error::StoreError;

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Reference to a single document within a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    collection: String,
    id: String,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Result<Self, StoreError> {
        let collection = collection.into();
        let id = id.into();
        if collection.is_empty() {
            return Err(StoreError::InvalidReference {
                what: "collection name",
            });
        }
        if id.is_empty() {
            return Err(StoreError::InvalidReference { what: "document id" });
        }
        Ok(DocRef { collection, id })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Reference to a whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    name: String,
}

impl CollectionRef {
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StoreError::InvalidReference {
                what: "collection name",
            });
        }
        Ok(CollectionRef { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference a document inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> Result<DocRef, StoreError> {
        DocRef::new(self.name.clone(), id)
    }

    /// Start a query over this collection.
    pub fn query(&self) -> Query {
        Query {
            collection: self.name.clone(),
            filters: Vec::new(),
            order: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: String,
    value: Value,
}

#[derive(Debug, Clone, PartialEq)]
struct SortKey {
    field: String,
    direction: Direction,
}

/// A composed, still-inert query descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
    order: Option<SortKey>,
}

impl Query {
    /// Query over a named collection.
    pub fn collection(name: impl Into<String>) -> Result<Self, StoreError> {
        CollectionRef::new(name).map(|c| c.query())
    }

    /// Add an equality predicate. Predicates combine as a logical AND.
    ///
    /// A document whose field is absent matches nothing, including a null
    /// filter value.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Set the sort key. At most one applies; a second call replaces the
    /// first. Ties keep document-id order.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub(crate) fn collection_name(&self) -> &str {
        &self.collection
    }

    pub(crate) fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|f| doc.get(&f.field).is_some_and(|v| *v == f.value))
    }

    pub(crate) fn sort(&self, docs: &mut [DocumentSnapshot]) {
        let Some(key) = &self.order else { return };
        docs.sort_by(|a, b| {
            let av = a.fields().get(&key.field).unwrap_or(&Value::Null);
            let bv = b.fields().get(&key.field).unwrap_or(&Value::Null);
            let ord = compare_values(av, bv);
            match key.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
}

/// Total order over JSON values: null < bool < number < string < array <
/// object, with per-type comparison inside each rank.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xv, yv) in x.iter().zip(y.iter()) {
                let ord = compare_values(xv, yv);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            // maps iterate in key order, so pairwise comparison is total
            for ((xk, xv), (yk, yv)) in x.iter().zip(y.iter()) {
                let ord = xk.cmp(yk).then_with(|| compare_values(xv, yv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
