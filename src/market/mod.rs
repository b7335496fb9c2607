//! Marketplace protocol - providers publish catalog items and dated,
//! quantity-limited offerings; customers reserve units; notifications flow
//! back on every transition.
//!
//! Every operation takes the acting identity as an explicit parameter;
//! nothing is read from ambient session state.

mod catalog;
mod error;
mod models;
mod notifications;
mod reservations;
mod users;

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::lock::LockManager;
use crate::publisher::NotificationPublisher;
use crate::store::{Database, QuerySnapshot};

pub use catalog::OfferingUpdate;
pub use error::MarketError;
pub use models::{
    AppNotification, CatalogItem, NotificationKind, Offering, ProviderProfile, Reservation,
    ReservationStatus, Role, User,
};

/// Marketplace service over a document store.
///
/// Holds the store handle, the per-offering lock manager that serializes
/// reservation traffic, and an optional publisher mirroring notifications
/// in-process.
pub struct Marketplace {
    db: Database,
    offering_locks: LockManager,
    publisher: Mutex<Option<Box<dyn NotificationPublisher>>>,
}

impl Marketplace {
    pub fn new(db: Database) -> Self {
        Marketplace {
            db,
            offering_locks: LockManager::new(),
            publisher: Mutex::new(None),
        }
    }

    pub fn with_publisher(db: Database, publisher: Box<dyn NotificationPublisher>) -> Self {
        Marketplace {
            db,
            offering_locks: LockManager::new(),
            publisher: Mutex::new(Some(publisher)),
        }
    }

    /// The underlying store handle.
    pub fn db(&self) -> &Database {
        &self.db
    }
}

pub(crate) fn collect<T: DeserializeOwned>(snapshot: QuerySnapshot) -> Result<Vec<T>, MarketError> {
    snapshot
        .iter()
        .map(|doc| doc.deserialize().map_err(MarketError::from))
        .collect()
}

pub(crate) fn not_found(collection: &str, id: &str) -> MarketError {
    MarketError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}
