//! Embedded document store: collections of JSON documents with equality
//! queries, batched writes, field-level increments, and live query
//! subscriptions.

mod batch;
mod database;
mod durable;
mod field;
mod query;
mod snapshot;
mod subscription;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// A single document: field name → JSON value.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use batch::WriteBatch;
pub use database::Database;
pub use durable::{Collections, DurableStore, COLLECTIONS_KEY, SESSION_KEY};
pub use field::FieldValue;
pub use query::{CollectionRef, Direction, DocRef, Query};
pub use snapshot::{DocumentSnapshot, QuerySnapshot};
pub use subscription::Subscription;

/// Serialize a model into a document field map.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value).map_err(|e| StoreError::Serde(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::Serde(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Deserialize a document field map back into a model.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::Object(doc))
        .map_err(|e| StoreError::Serde(e.to_string()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
