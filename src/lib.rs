mod error;
mod lock;
mod market;
mod publisher;
mod session;
mod store;

pub use error::StoreError;
pub use lock::{LockGuard, LockManager};
pub use market::{
    AppNotification, CatalogItem, MarketError, Marketplace, NotificationKind, Offering,
    OfferingUpdate, ProviderProfile, Reservation, ReservationStatus, Role, User,
};
#[cfg(feature = "emitter")]
pub use publisher::EmitterPublisher;
pub use publisher::{LogPublisher, NotificationPublisher, PublishError};
pub use session::{SessionStore, SessionUser};
pub use store::{
    from_document, to_document, CollectionRef, Collections, Database, Direction, DocRef, Document,
    DocumentSnapshot, DurableStore, FieldValue, Query, QuerySnapshot, Subscription, WriteBatch,
    COLLECTIONS_KEY, SESSION_KEY,
};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
