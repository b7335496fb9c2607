//! Field update values: literal sets and the numeric increment sentinel.

use serde_json::Value;

use super::Document;

/// How `update_doc` merges one field.
///
/// `Increment` is the only non-literal merge semantic the store supports:
/// it adds to the current numeric value instead of overwriting, treating a
/// missing or non-numeric current value as 0. Integer operands stay
/// integers.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Set(Value),
    Increment(i64),
}

impl FieldValue {
    pub fn set(value: impl Into<Value>) -> Self {
        FieldValue::Set(value.into())
    }

    pub fn increment(n: i64) -> Self {
        FieldValue::Increment(n)
    }
}

pub(crate) fn apply(doc: &mut Document, field: &str, value: &FieldValue) {
    match value {
        FieldValue::Set(v) => {
            doc.insert(field.to_string(), v.clone());
        }
        FieldValue::Increment(n) => {
            let next = match doc.get(field) {
                Some(Value::Number(num)) => {
                    if let Some(i) = num.as_i64() {
                        Value::from(i.saturating_add(*n))
                    } else if let Some(f) = num.as_f64() {
                        serde_json::Number::from_f64(f + *n as f64)
                            .map(Value::Number)
                            .unwrap_or_else(|| Value::from(*n))
                    } else {
                        Value::from(*n)
                    }
                }
                _ => Value::from(*n),
            };
            doc.insert(field.to_string(), next);
        }
    }
}
