//! WriteBatch - accumulate set/update/delete operations and apply them in
//! one pass: a single persistence write and a single listener pass.
//!
//! This is the closest available approximation to a transaction; the
//! reservation protocol commits its insert-plus-decrement through it.

use std::collections::HashSet;

use super::database::Database;
use super::field::{self, FieldValue};
use super::query::DocRef;
use super::Document;
use crate::error::StoreError;

enum BatchOp {
    Set {
        doc: DocRef,
        fields: Document,
    },
    Update {
        doc: DocRef,
        updates: Vec<(String, FieldValue)>,
    },
    Delete {
        doc: DocRef,
    },
}

/// Builder for a multi-write commit. Methods chain; `commit` consumes.
pub struct WriteBatch {
    db: Database,
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub(crate) fn new(db: Database) -> Self {
        WriteBatch {
            db,
            ops: Vec::new(),
        }
    }

    /// Queue a full-document upsert.
    pub fn set(mut self, doc: &DocRef, fields: Document) -> Self {
        self.ops.push(BatchOp::Set {
            doc: doc.clone(),
            fields,
        });
        self
    }

    /// Queue a field merge against an existing document.
    pub fn update(mut self, doc: &DocRef, updates: &[(&str, FieldValue)]) -> Self {
        self.ops.push(BatchOp::Update {
            doc: doc.clone(),
            updates: updates
                .iter()
                .map(|(field, value)| ((*field).to_string(), value.clone()))
                .collect(),
        });
        self
    }

    /// Queue a document removal.
    pub fn delete(mut self, doc: &DocRef) -> Self {
        self.ops.push(BatchOp::Delete { doc: doc.clone() });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every queued operation under one write lock, then persist once
    /// and run one listener pass.
    ///
    /// Update targets are validated before anything is applied: a missing
    /// target fails the whole batch with `NotFound` and no sub-operation
    /// takes effect. A `set` earlier in the batch satisfies a later
    /// `update` of the same document.
    pub fn commit(self) -> Result<(), StoreError> {
        let WriteBatch { db, ops } = self;
        if ops.is_empty() {
            return Ok(());
        }
        db.mutate(|state| {
            {
                let mut created: HashSet<(&str, &str)> = HashSet::new();
                let mut deleted: HashSet<(&str, &str)> = HashSet::new();
                for op in &ops {
                    match op {
                        BatchOp::Set { doc, .. } => {
                            created.insert((doc.collection(), doc.id()));
                            deleted.remove(&(doc.collection(), doc.id()));
                        }
                        BatchOp::Delete { doc } => {
                            deleted.insert((doc.collection(), doc.id()));
                            created.remove(&(doc.collection(), doc.id()));
                        }
                        BatchOp::Update { doc, .. } => {
                            let key = (doc.collection(), doc.id());
                            let exists = created.contains(&key)
                                || (!deleted.contains(&key)
                                    && state
                                        .get(doc.collection())
                                        .is_some_and(|c| c.contains_key(doc.id())));
                            if !exists {
                                return Err(StoreError::NotFound {
                                    collection: doc.collection().to_string(),
                                    id: doc.id().to_string(),
                                });
                            }
                        }
                    }
                }
            }

            for op in ops {
                match op {
                    BatchOp::Set { doc, fields } => {
                        state
                            .entry(doc.collection().to_string())
                            .or_default()
                            .insert(doc.id().to_string(), fields);
                    }
                    BatchOp::Update { doc, updates } => {
                        if let Some(fields) = state
                            .get_mut(doc.collection())
                            .and_then(|c| c.get_mut(doc.id()))
                        {
                            for (field, value) in &updates {
                                field::apply(fields, field, value);
                            }
                        }
                    }
                    BatchOp::Delete { doc } => {
                        if let Some(collection) = state.get_mut(doc.collection()) {
                            collection.remove(doc.id());
                        }
                    }
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Query;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn commit_applies_all_operations() {
        let db = Database::in_memory();
        let o1 = DocRef::new("offerings", "o1").unwrap();
        db.set_doc(&o1, doc(json!({"quantityRemaining": 5}))).unwrap();

        let r1 = DocRef::new("reservations", "r1").unwrap();
        db.batch()
            .set(&r1, doc(json!({"status": "pending"})))
            .update(&o1, &[("quantityRemaining", FieldValue::increment(-1))])
            .commit()
            .unwrap();

        assert_eq!(
            db.get_doc(&o1).unwrap().unwrap().get("quantityRemaining"),
            Some(&json!(4))
        );
        assert!(db.get_doc(&r1).unwrap().is_some());
    }

    #[test]
    fn missing_update_target_rejects_whole_batch() {
        let db = Database::in_memory();
        let r1 = DocRef::new("reservations", "r1").unwrap();
        let ghost = DocRef::new("offerings", "ghost").unwrap();

        let err = db
            .batch()
            .set(&r1, doc(json!({"status": "pending"})))
            .update(&ghost, &[("quantityRemaining", FieldValue::increment(-1))])
            .commit()
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        // nothing applied
        assert!(db.get_doc(&r1).unwrap().is_none());
        assert_eq!(db.revision(), 0);
    }

    #[test]
    fn set_earlier_in_batch_satisfies_later_update() {
        let db = Database::in_memory();
        let r = DocRef::new("things", "t1").unwrap();
        db.batch()
            .set(&r, doc(json!({"count": 1})))
            .update(&r, &[("count", FieldValue::increment(2))])
            .commit()
            .unwrap();
        assert_eq!(db.get_doc(&r).unwrap().unwrap().get("count"), Some(&json!(3)));
    }

    #[test]
    fn delete_earlier_in_batch_invalidates_later_update() {
        let db = Database::in_memory();
        let r = DocRef::new("things", "t1").unwrap();
        db.set_doc(&r, doc(json!({"count": 1}))).unwrap();

        let err = db
            .batch()
            .delete(&r)
            .update(&r, &[("count", FieldValue::increment(1))])
            .commit()
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        // untouched by the failed batch
        assert!(db.get_doc(&r).unwrap().is_some());
    }

    #[test]
    fn commit_runs_one_listener_pass() {
        let db = Database::in_memory();
        let deliveries: Arc<Mutex<u32>> = Default::default();
        let counter = deliveries.clone();
        let q = Query::collection("things").unwrap();
        let _sub = db
            .subscribe(&q, move |_| {
                *counter.lock().unwrap() += 1;
            })
            .unwrap();
        assert_eq!(*deliveries.lock().unwrap(), 1); // initial delivery

        db.batch()
            .set(&DocRef::new("things", "a").unwrap(), doc(json!({"n": 1})))
            .set(&DocRef::new("things", "b").unwrap(), doc(json!({"n": 2})))
            .set(&DocRef::new("things", "c").unwrap(), doc(json!({"n": 3})))
            .commit()
            .unwrap();
        assert_eq!(*deliveries.lock().unwrap(), 2); // one pass for the whole batch
        assert_eq!(db.revision(), 1);
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let db = Database::in_memory();
        db.batch().commit().unwrap();
        assert_eq!(db.revision(), 0);
    }
}
