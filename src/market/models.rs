//! Domain documents stored by the marketplace protocol.
//!
//! Wire names are camelCase; every cross-entity relationship is a string-id
//! back-reference resolved by lookup, never an in-memory pointer. The store
//! enforces none of this; the protocol layer is the schema contract.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
    Admin,
}

/// Reservation lifecycle status.
///
/// ```text
///         create             confirm            complete
/// (none) ───────► pending ───────────► confirmed ───────► completed
///                    │
///                    │ cancel
///                    ▼
///                cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    /// Whether the state machine defines an edge from `self` to `to`.
    /// Terminal states have no outgoing edges; self-transitions are not
    /// edges either.
    pub fn can_transition(self, to: ReservationStatus) -> bool {
        matches!(
            (self, to),
            (ReservationStatus::Pending, ReservationStatus::Confirmed)
                | (ReservationStatus::Pending, ReservationStatus::Cancelled)
                | (ReservationStatus::Confirmed, ReservationStatus::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub provider_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub followers_count: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub saved_categories: Option<Vec<String>>,
}

impl ProviderProfile {
    pub const COLLECTION: &'static str = "providers";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub description: String,
    pub price_default: f64,
    pub currency: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CatalogItem {
    pub const COLLECTION: &'static str = "catalog_items";
}

/// A dated, quantity-limited sale instance of a catalog item.
///
/// `item_name` and `item_image_url` are snapshots taken at creation time;
/// later item edits do not flow through. `quantity_remaining` never leaves
/// `0..=quantity_total` under protocol operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offering {
    pub id: String,
    pub item_id: String,
    pub provider_id: String,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub item_image_url: Option<String>,
    pub price: f64,
    pub quantity_total: i64,
    pub quantity_remaining: i64,
    pub date: NaiveDate,
    pub is_active: bool,
}

impl Offering {
    pub const COLLECTION: &'static str = "offerings";
}

/// A customer's claim on units of an offering.
///
/// `offering_name` and `customer_name` are denormalized at creation so
/// listings render without extra lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub offering_id: String,
    pub customer_id: String,
    pub provider_id: String,
    pub offering_name: String,
    pub customer_name: String,
    pub quantity: i64,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payment_reference: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub const COLLECTION: &'static str = "reservations";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNotification {
    pub id: String,
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link: Option<String>,
}

impl AppNotification {
    pub const COLLECTION: &'static str = "notifications";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_machine_edges() {
        use ReservationStatus::*;
        assert!(Pending.can_transition(Confirmed));
        assert!(Pending.can_transition(Cancelled));
        assert!(Confirmed.can_transition(Completed));

        assert!(!Confirmed.can_transition(Cancelled));
        assert!(!Pending.can_transition(Completed));
        assert!(!Pending.can_transition(Pending));
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in [Pending, Confirmed, Completed, Cancelled] {
                assert!(!from.can_transition(to));
            }
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ReservationStatus::Pending).unwrap(),
            json!("pending")
        );
        assert_eq!(ReservationStatus::Confirmed.as_str(), "confirmed");
    }

    #[test]
    fn offering_wire_names_are_camel_case() {
        let offering = Offering {
            id: "o1".into(),
            item_id: "i1".into(),
            provider_id: "p1".into(),
            item_name: "Bread box".into(),
            item_image_url: None,
            price: 50.0,
            quantity_total: 10,
            quantity_remaining: 10,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            is_active: true,
        };
        let value = serde_json::to_value(&offering).unwrap();
        assert_eq!(value["quantityRemaining"], json!(10));
        assert_eq!(value["itemId"], json!("i1"));
        assert_eq!(value["date"], json!("2026-03-14"));
        assert_eq!(value.get("itemImageUrl"), None);

        let back: Offering = serde_json::from_value(value).unwrap();
        assert_eq!(back, offering);
    }

    #[test]
    fn notification_kind_uses_type_field() {
        let n = AppNotification {
            id: "n1".into(),
            recipient_id: "u1".into(),
            title: "t".into(),
            body: "b".into(),
            kind: NotificationKind::Warning,
            read: false,
            created_at: Utc::now(),
            link: None,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], json!("warning"));
    }
}
