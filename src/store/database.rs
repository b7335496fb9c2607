//! Database - the single store handle for document reads, writes, batches,
//! and live query subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use chrono::Utc;
use tracing::warn;

use super::batch::WriteBatch;
use super::durable::{Collections, DurableStore, COLLECTIONS_KEY};
use super::field::{self, FieldValue};
use super::query::{CollectionRef, DocRef, Query};
use super::snapshot::{DocumentSnapshot, QuerySnapshot};
use super::subscription::{ListenerRegistry, Subscription};
use super::Document;
use crate::error::StoreError;

struct DbInner {
    store: DurableStore,
    state: RwLock<Collections>,
    revision: AtomicU64,
    listeners: Arc<ListenerRegistry>,
}

/// Handle to the document store. Cheap to clone; all clones share state.
///
/// In-memory mutations are single uninterruptible steps behind one write
/// lock; no operation observes a half-applied mutation from another.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DbInner>,
}

impl Database {
    /// Open against a durable store, loading the persisted snapshot once.
    ///
    /// A missing snapshot starts empty; a corrupt one fails with
    /// `StoreError::Unavailable`.
    pub fn open(store: DurableStore) -> Result<Self, StoreError> {
        let state = match store.load(COLLECTIONS_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::Unavailable(format!("collections snapshot: {}", e)))?,
            None => Collections::new(),
        };
        Ok(Self::with_state(store, state))
    }

    /// Open, degrading to a memory-only store when the snapshot is
    /// unusable. The degradation holds for the rest of the process; the
    /// corrupt file is left untouched.
    pub fn open_or_memory(store: DurableStore) -> Self {
        match Self::open(store) {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "snapshot unusable, continuing memory-only");
                Self::in_memory()
            }
        }
    }

    /// A store with no persistence at all.
    pub fn in_memory() -> Self {
        Self::with_state(DurableStore::in_memory(), Collections::new())
    }

    fn with_state(store: DurableStore, state: Collections) -> Self {
        Database {
            inner: Arc::new(DbInner {
                store,
                state: RwLock::new(state),
                revision: AtomicU64::new(0),
                listeners: Arc::new(ListenerRegistry::new()),
            }),
        }
    }

    /// Number of committed mutations since open.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    /// Fresh document id: millisecond timestamp plus a random suffix.
    pub fn generate_id() -> String {
        format!(
            "{}-{:08x}",
            Utc::now().timestamp_millis(),
            rand::random::<u32>()
        )
    }

    /// Read one document. A missing document is `Ok(None)`, not an error.
    pub fn get_doc(&self, doc: &DocRef) -> Result<Option<DocumentSnapshot>, StoreError> {
        let state = self.read_state()?;
        Ok(state
            .get(doc.collection())
            .and_then(|c| c.get(doc.id()))
            .map(|fields| DocumentSnapshot::new(doc.id().to_string(), fields.clone())))
    }

    /// Evaluate a query. Unknown collections yield an empty snapshot.
    pub fn get_docs(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        let state = self.read_state()?;
        Ok(Self::evaluate(&state, query))
    }

    pub(crate) fn evaluate(state: &Collections, query: &Query) -> QuerySnapshot {
        let mut docs = Vec::new();
        if let Some(collection) = state.get(query.collection_name()) {
            for (id, fields) in collection {
                if query.matches(fields) {
                    docs.push(DocumentSnapshot::new(id.clone(), fields.clone()));
                }
            }
        }
        query.sort(&mut docs);
        QuerySnapshot::new(docs)
    }

    /// Unconditional full-document upsert. Creates the collection if absent.
    pub fn set_doc(&self, doc: &DocRef, fields: Document) -> Result<(), StoreError> {
        self.mutate(|state| {
            state
                .entry(doc.collection().to_string())
                .or_default()
                .insert(doc.id().to_string(), fields);
            Ok(())
        })
    }

    /// Insert under a freshly generated id; returns the id.
    pub fn add_doc(&self, collection: &CollectionRef, fields: Document) -> Result<String, StoreError> {
        let id = Self::generate_id();
        self.mutate(|state| {
            state
                .entry(collection.name().to_string())
                .or_default()
                .insert(id.clone(), fields);
            Ok(())
        })?;
        Ok(id)
    }

    /// Merge field updates into an existing document. A missing target
    /// fails with `StoreError::NotFound`.
    pub fn update_doc(&self, doc: &DocRef, updates: &[(&str, FieldValue)]) -> Result<(), StoreError> {
        self.mutate(|state| {
            let fields = state
                .get_mut(doc.collection())
                .and_then(|c| c.get_mut(doc.id()))
                .ok_or_else(|| StoreError::NotFound {
                    collection: doc.collection().to_string(),
                    id: doc.id().to_string(),
                })?;
            for (field, value) in updates {
                field::apply(fields, field, value);
            }
            Ok(())
        })
    }

    /// Remove a document. A no-op when absent.
    pub fn delete_doc(&self, doc: &DocRef) -> Result<(), StoreError> {
        self.mutate(|state| {
            if let Some(collection) = state.get_mut(doc.collection()) {
                collection.remove(doc.id());
            }
            Ok(())
        })
    }

    /// Start a write batch against this store.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.clone())
    }

    /// Register a live query. The callback fires once immediately with the
    /// current result set, then again after every committed mutation.
    pub fn subscribe(
        &self,
        query: &Query,
        callback: impl Fn(&QuerySnapshot) + Send + Sync + 'static,
    ) -> Result<Subscription, StoreError> {
        let subscription = self
            .inner
            .listeners
            .register(query.clone(), Box::new(callback));
        let snapshot = self.get_docs(query)?;
        if let Some(listener) = self.inner.listeners.get(subscription.id()) {
            listener.invoke(&snapshot);
        }
        Ok(subscription)
    }

    /// Apply one mutation under the write lock, persist the snapshot,
    /// bump the revision, and run one listener pass.
    ///
    /// Closures must not modify `state` before their first fallible step;
    /// an error here must leave the store untouched.
    pub(crate) fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Collections) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let (out, snapshot) = {
            let mut state = self
                .inner
                .state
                .write()
                .map_err(|_| StoreError::Storage("store state lock poisoned".into()))?;
            let out = apply(&mut state)?;
            let snapshot =
                serde_json::to_value(&*state).map_err(|e| StoreError::Serde(e.to_string()))?;
            (out, snapshot)
        };
        self.inner.store.save(COLLECTIONS_KEY, &snapshot)?;
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
        self.notify_listeners();
        Ok(out)
    }

    /// Re-evaluate every registered query and deliver the fresh result
    /// set. Runs with no store lock held during callbacks, so a callback
    /// may itself issue store operations.
    fn notify_listeners(&self) {
        for listener in self.inner.listeners.active() {
            let result = {
                let Ok(state) = self.inner.state.read() else {
                    return;
                };
                Self::evaluate(&state, listener.query())
            };
            listener.invoke(&result);
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.inner
            .state
            .read()
            .map_err(|_| StoreError::Storage("store state lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Direction;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn set_then_get_round_trips_all_field_types() {
        let db = Database::in_memory();
        let r = DocRef::new("things", "t1").unwrap();
        let fields = doc(json!({
            "name": "widget",
            "price": 9.75,
            "count": 3,
            "active": true,
            "tags": ["a", "b"],
            "meta": {"nested": {"deep": null}},
        }));
        db.set_doc(&r, fields.clone()).unwrap();

        let snap = db.get_doc(&r).unwrap().unwrap();
        assert_eq!(snap.fields(), &fields);
        assert_eq!(snap.id(), "t1");
    }

    #[test]
    fn add_doc_round_trips_and_ids_are_distinct() {
        let db = Database::in_memory();
        let c = CollectionRef::new("things").unwrap();
        let fields = doc(json!({"n": 1}));

        let a = db.add_doc(&c, fields.clone()).unwrap();
        let b = db.add_doc(&c, fields.clone()).unwrap();
        assert_ne!(a, b);

        let snap = db.get_doc(&c.doc(&a).unwrap()).unwrap().unwrap();
        assert_eq!(snap.fields(), &fields);
    }

    #[test]
    fn get_missing_doc_is_none() {
        let db = Database::in_memory();
        let r = DocRef::new("things", "absent").unwrap();
        assert!(db.get_doc(&r).unwrap().is_none());
    }

    #[test]
    fn set_doc_is_full_overwrite() {
        let db = Database::in_memory();
        let r = DocRef::new("things", "t1").unwrap();
        db.set_doc(&r, doc(json!({"a": 1, "b": 2}))).unwrap();
        db.set_doc(&r, doc(json!({"a": 10}))).unwrap();

        let snap = db.get_doc(&r).unwrap().unwrap();
        assert_eq!(snap.fields(), &doc(json!({"a": 10})));
    }

    #[test]
    fn update_merges_and_increments() {
        let db = Database::in_memory();
        let r = DocRef::new("offerings", "o1").unwrap();
        db.set_doc(&r, doc(json!({"quantityRemaining": 10, "price": 50})))
            .unwrap();

        db.update_doc(
            &r,
            &[
                ("quantityRemaining", FieldValue::increment(-1)),
                ("price", FieldValue::set(60)),
            ],
        )
        .unwrap();
        db.update_doc(&r, &[("quantityRemaining", FieldValue::increment(-2))])
            .unwrap();

        let snap = db.get_doc(&r).unwrap().unwrap();
        assert_eq!(snap.get("quantityRemaining"), Some(&json!(7)));
        assert_eq!(snap.get("price"), Some(&json!(60)));
    }

    #[test]
    fn update_missing_doc_is_not_found() {
        let db = Database::in_memory();
        let r = DocRef::new("offerings", "ghost").unwrap();
        let err = db
            .update_doc(&r, &[("price", FieldValue::set(1))])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(db.revision(), 0);
    }

    #[test]
    fn delete_is_noop_when_absent() {
        let db = Database::in_memory();
        let r = DocRef::new("things", "t1").unwrap();
        db.delete_doc(&r).unwrap();

        db.set_doc(&r, doc(json!({"n": 1}))).unwrap();
        db.delete_doc(&r).unwrap();
        assert!(db.get_doc(&r).unwrap().is_none());
    }

    #[test]
    fn query_filters_and_orders() {
        let db = Database::in_memory();
        for (id, provider, price) in [("a", "p1", 30), ("b", "p2", 10), ("c", "p1", 20)] {
            db.set_doc(
                &DocRef::new("offerings", id).unwrap(),
                doc(json!({"providerId": provider, "price": price})),
            )
            .unwrap();
        }

        let q = Query::collection("offerings")
            .unwrap()
            .where_eq("providerId", "p1")
            .order_by("price", Direction::Desc);
        let snap = db.get_docs(&q).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.docs()[0].id(), "a");
        assert_eq!(snap.docs()[1].id(), "c");

        // idempotent between writes
        assert_eq!(db.get_docs(&q).unwrap(), snap);
    }

    #[test]
    fn ties_keep_document_id_order() {
        let db = Database::in_memory();
        for id in ["b", "c", "a"] {
            db.set_doc(
                &DocRef::new("offerings", id).unwrap(),
                doc(json!({"price": 10})),
            )
            .unwrap();
        }
        let q = Query::collection("offerings")
            .unwrap()
            .order_by("price", Direction::Asc);
        let snapshot = db.get_docs(&q).unwrap();
        let ids: Vec<&str> = snapshot.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_collection_queries_empty() {
        let db = Database::in_memory();
        let q = Query::collection("nope").unwrap();
        assert!(db.get_docs(&q).unwrap().is_empty());
    }

    #[test]
    fn subscribe_delivers_immediately_then_on_every_mutation() {
        let db = Database::in_memory();
        let q = Query::collection("notifications")
            .unwrap()
            .where_eq("recipientId", "u1");
        let seen: std::sync::Arc<Mutex<Vec<usize>>> = Default::default();
        let seen_by_cb = seen.clone();

        let sub = db
            .subscribe(&q, move |snap| {
                seen_by_cb.lock().unwrap().push(snap.len());
            })
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0]);

        db.set_doc(
            &DocRef::new("notifications", "n1").unwrap(),
            doc(json!({"recipientId": "u1"})),
        )
        .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);

        // unrelated mutation still re-delivers the unchanged result set
        db.set_doc(
            &DocRef::new("notifications", "n2").unwrap(),
            doc(json!({"recipientId": "other"})),
        )
        .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 1]);

        sub.unsubscribe();
        sub.unsubscribe(); // idempotent
        db.delete_doc(&DocRef::new("notifications", "n1").unwrap())
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 1]);
    }

    #[test]
    fn revision_counts_committed_mutations() {
        let db = Database::in_memory();
        assert_eq!(db.revision(), 0);
        let r = DocRef::new("things", "t1").unwrap();
        db.set_doc(&r, doc(json!({"n": 1}))).unwrap();
        db.update_doc(&r, &[("n", FieldValue::increment(1))])
            .unwrap();
        assert_eq!(db.revision(), 2);
    }
}
