//! Notification inbox: stored documents plus the publisher mirror.

use chrono::Utc;
use tracing::warn;

use crate::store::{
    to_document, Database, Direction, DocRef, FieldValue, Query, QuerySnapshot, Subscription,
};

use super::models::{AppNotification, NotificationKind};
use super::{collect, not_found, MarketError, Marketplace};

/// Event type mirrored to the configured publisher for every stored
/// notification.
pub(crate) const NOTIFICATION_CREATED: &str = "notification.created";

impl Marketplace {
    /// Store a notification for a recipient and mirror it to the
    /// configured publisher. The mirror is best-effort; its failure is
    /// logged and swallowed.
    pub fn notify(
        &self,
        recipient_id: &str,
        title: &str,
        body: &str,
        kind: NotificationKind,
        link: Option<String>,
    ) -> Result<AppNotification, MarketError> {
        let notification = AppNotification {
            id: Database::generate_id(),
            recipient_id: recipient_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            kind,
            read: false,
            created_at: Utc::now(),
            link,
        };
        let doc = DocRef::new(AppNotification::COLLECTION, &notification.id)?;
        self.db.set_doc(&doc, to_document(&notification)?)?;
        self.mirror_to_publisher(&notification);
        Ok(notification)
    }

    /// Emit a notification whose failure must not disturb the primary
    /// write it accompanies.
    pub(crate) fn notify_best_effort(
        &self,
        recipient_id: &str,
        title: &str,
        body: &str,
        kind: NotificationKind,
        link: Option<String>,
    ) {
        if let Err(e) = self.notify(recipient_id, title, body, kind, link) {
            warn!(error = %e, recipient = recipient_id, "notification dropped");
        }
    }

    /// A recipient's notifications, newest first.
    pub fn inbox(&self, recipient_id: &str) -> Result<Vec<AppNotification>, MarketError> {
        collect(self.db.get_docs(&Self::inbox_query(recipient_id)?)?)
    }

    /// Unread notifications for the badge on the bell.
    pub fn unread_count(&self, recipient_id: &str) -> Result<usize, MarketError> {
        let query = Query::collection(AppNotification::COLLECTION)?
            .where_eq("recipientId", recipient_id)
            .where_eq("read", false);
        Ok(self.db.get_docs(&query)?.len())
    }

    /// Flip a notification's read flag, false → true only. Re-marking an
    /// already-read notification is a no-op.
    pub fn mark_read(&self, notification_id: &str) -> Result<(), MarketError> {
        let doc = DocRef::new(AppNotification::COLLECTION, notification_id)?;
        let snap = self
            .db
            .get_doc(&doc)?
            .ok_or_else(|| not_found(AppNotification::COLLECTION, notification_id))?;
        let notification: AppNotification = snap.deserialize()?;
        if notification.read {
            return Ok(());
        }
        self.db.update_doc(&doc, &[("read", FieldValue::set(true))])?;
        Ok(())
    }

    /// Live inbox subscription: the callback receives the recipient's full
    /// notification list immediately and again after every store mutation.
    pub fn subscribe_inbox(
        &self,
        recipient_id: &str,
        callback: impl Fn(&QuerySnapshot) + Send + Sync + 'static,
    ) -> Result<Subscription, MarketError> {
        let query = Self::inbox_query(recipient_id)?;
        Ok(self.db.subscribe(&query, callback)?)
    }

    fn inbox_query(recipient_id: &str) -> Result<Query, MarketError> {
        Ok(Query::collection(AppNotification::COLLECTION)?
            .where_eq("recipientId", recipient_id)
            .order_by("createdAt", Direction::Desc))
    }

    fn mirror_to_publisher(&self, notification: &AppNotification) {
        let Ok(mut publisher) = self.publisher.lock() else {
            return;
        };
        let Some(publisher) = publisher.as_mut() else {
            return;
        };
        let payload = match serde_json::to_string(notification) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "notification payload not serializable");
                return;
            }
        };
        if let Err(e) = publisher.publish(NOTIFICATION_CREATED, &payload) {
            warn!(error = %e, recipient = %notification.recipient_id, "notification publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::LogPublisher;
    use crate::store::Database;
    use std::sync::{Arc, Mutex};

    fn market() -> Marketplace {
        Marketplace::new(Database::in_memory())
    }

    #[test]
    fn inbox_is_per_recipient_newest_first() {
        let market = market();
        market
            .notify("u1", "first", "b", NotificationKind::Info, None)
            .unwrap();
        // keep createdAt strictly increasing
        std::thread::sleep(std::time::Duration::from_millis(2));
        market
            .notify("u1", "second", "b", NotificationKind::Info, None)
            .unwrap();
        market
            .notify("u2", "other", "b", NotificationKind::Info, None)
            .unwrap();

        let inbox = market.inbox("u1").unwrap();
        let titles: Vec<&str> = inbox.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn mark_read_never_reverts() {
        let market = market();
        let n = market
            .notify("u1", "t", "b", NotificationKind::Info, None)
            .unwrap();
        assert_eq!(market.unread_count("u1").unwrap(), 1);

        market.mark_read(&n.id).unwrap();
        assert_eq!(market.unread_count("u1").unwrap(), 0);

        // no-op the second time
        market.mark_read(&n.id).unwrap();
        let stored = market.inbox("u1").unwrap();
        assert!(stored[0].read);
    }

    #[test]
    fn mark_read_on_missing_is_not_found() {
        let market = market();
        assert!(matches!(
            market.mark_read("ghost"),
            Err(MarketError::NotFound { .. })
        ));
    }

    #[test]
    fn publisher_mirrors_stored_notifications() {
        let buffer: Arc<Mutex<Vec<String>>> = Default::default();
        let market = Marketplace::with_publisher(
            Database::in_memory(),
            Box::new(LogPublisher::with_buffer(buffer.clone())),
        );
        market
            .notify("p1", "New reservation", "b", NotificationKind::Success, None)
            .unwrap();

        let lines = buffer.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(NOTIFICATION_CREATED));
        assert!(lines[0].contains("New reservation"));
    }
}
