use std::fmt;

/// Errors surfaced by the document store layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A document or collection descriptor was malformed.
    InvalidReference { what: &'static str },
    /// The persisted snapshot could not be read or parsed.
    Unavailable(String),
    /// An update or delete targeted a document that does not exist.
    NotFound { collection: String, id: String },
    /// Serialization or deserialization failed.
    Serde(String),
    /// Storage-level failure (lock poisoning, explicit persistence errors).
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidReference { what } => {
                write!(f, "invalid reference: empty {}", what)
            }
            StoreError::Unavailable(reason) => {
                write!(f, "store unavailable: {}", reason)
            }
            StoreError::NotFound { collection, id } => {
                write!(f, "document not found: {}:{}", collection, id)
            }
            StoreError::Serde(msg) => write!(f, "serialization error: {}", msg),
            StoreError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
