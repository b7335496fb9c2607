//! Catalog item and offering lifecycle.
//!
//! Offerings snapshot the item's name and image at creation; items with
//! reservation history are soft-deleted so the linkage survives.

use chrono::{NaiveDate, Utc};

use crate::store::{to_document, Database, Direction, DocRef, FieldValue, Query};

use super::models::{CatalogItem, Offering, Reservation};
use super::{collect, not_found, MarketError, Marketplace};

/// Partial edit of an offering. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferingUpdate {
    pub price: Option<f64>,
    pub quantity_total: Option<i64>,
    pub is_active: Option<bool>,
}

impl Marketplace {
    /// Store a new catalog item. The id is assigned here; any id on the
    /// draft is replaced.
    pub fn create_catalog_item(&self, draft: CatalogItem) -> Result<CatalogItem, MarketError> {
        let mut item = draft;
        item.id = Database::generate_id();
        if item.created_at.is_none() {
            item.created_at = Some(Utc::now());
        }
        let doc = DocRef::new(CatalogItem::COLLECTION, &item.id)?;
        self.db.set_doc(&doc, to_document(&item)?)?;
        Ok(item)
    }

    pub fn get_catalog_item(&self, item_id: &str) -> Result<Option<CatalogItem>, MarketError> {
        let doc = DocRef::new(CatalogItem::COLLECTION, item_id)?;
        match self.db.get_doc(&doc)? {
            Some(snap) => Ok(Some(snap.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Full overwrite of an existing item (provider edit).
    pub fn update_catalog_item(&self, item: &CatalogItem) -> Result<(), MarketError> {
        let doc = DocRef::new(CatalogItem::COLLECTION, &item.id)?;
        if self.db.get_doc(&doc)?.is_none() {
            return Err(not_found(CatalogItem::COLLECTION, &item.id));
        }
        self.db.set_doc(&doc, to_document(item)?)?;
        Ok(())
    }

    /// A provider's active items, the ones eligible for new offerings.
    pub fn active_catalog_items(&self, provider_id: &str) -> Result<Vec<CatalogItem>, MarketError> {
        let query = Query::collection(CatalogItem::COLLECTION)?
            .where_eq("providerId", provider_id)
            .where_eq("isActive", true)
            .order_by("name", Direction::Asc);
        collect(self.db.get_docs(&query)?)
    }

    /// Remove an item from circulation. Items whose offerings have
    /// reservation history are soft-deleted (isActive = false) to preserve
    /// the linkage; items without history are hard-deleted.
    pub fn retire_catalog_item(&self, item_id: &str) -> Result<(), MarketError> {
        let doc = DocRef::new(CatalogItem::COLLECTION, item_id)?;
        if self.db.get_doc(&doc)?.is_none() {
            return Err(not_found(CatalogItem::COLLECTION, item_id));
        }

        let offerings = self
            .db
            .get_docs(&Query::collection(Offering::COLLECTION)?.where_eq("itemId", item_id))?;
        let mut has_history = false;
        for offering in &offerings {
            let reservations = self.db.get_docs(
                &Query::collection(Reservation::COLLECTION)?
                    .where_eq("offeringId", offering.id()),
            )?;
            if !reservations.is_empty() {
                has_history = true;
                break;
            }
        }

        if has_history {
            self.db
                .update_doc(&doc, &[("isActive", FieldValue::set(false))])?;
        } else {
            self.db.delete_doc(&doc)?;
        }
        Ok(())
    }

    /// Publish an offering of an active item for a calendar date.
    /// `quantity_remaining` starts equal to `quantity_total`.
    pub fn create_offering(
        &self,
        item_id: &str,
        price: f64,
        quantity: i64,
        date: NaiveDate,
    ) -> Result<Offering, MarketError> {
        let item = self
            .get_catalog_item(item_id)?
            .ok_or_else(|| not_found(CatalogItem::COLLECTION, item_id))?;
        if !item.is_active {
            return Err(MarketError::Inactive {
                what: "catalog item",
                id: item_id.to_string(),
            });
        }

        let offering = Offering {
            id: Database::generate_id(),
            item_id: item.id.clone(),
            provider_id: item.provider_id.clone(),
            item_name: item.name.clone(),
            item_image_url: item.image_url.clone(),
            price,
            quantity_total: quantity,
            quantity_remaining: quantity,
            date,
            is_active: true,
        };
        let doc = DocRef::new(Offering::COLLECTION, &offering.id)?;
        self.db.set_doc(&doc, to_document(&offering)?)?;
        Ok(offering)
    }

    pub fn get_offering(&self, offering_id: &str) -> Result<Option<Offering>, MarketError> {
        let doc = DocRef::new(Offering::COLLECTION, offering_id)?;
        match self.db.get_doc(&doc)? {
            Some(snap) => Ok(Some(snap.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Edit an offering's price, total quantity, or active flag. Changing
    /// `quantity_total` shifts `quantity_remaining` by the same delta,
    /// clamped at zero.
    pub fn update_offering(
        &self,
        offering_id: &str,
        update: OfferingUpdate,
    ) -> Result<Offering, MarketError> {
        let _guard = self.offering_locks.acquire(offering_id)?;
        let mut offering = self
            .get_offering(offering_id)?
            .ok_or_else(|| not_found(Offering::COLLECTION, offering_id))?;

        let mut updates: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(price) = update.price {
            offering.price = price;
            updates.push(("price", FieldValue::set(price)));
        }
        if let Some(total) = update.quantity_total {
            let delta = total - offering.quantity_total;
            offering.quantity_total = total;
            offering.quantity_remaining = (offering.quantity_remaining + delta).max(0);
            updates.push(("quantityTotal", FieldValue::set(total)));
            updates.push((
                "quantityRemaining",
                FieldValue::set(offering.quantity_remaining),
            ));
        }
        if let Some(active) = update.is_active {
            offering.is_active = active;
            updates.push(("isActive", FieldValue::set(active)));
        }
        if updates.is_empty() {
            return Ok(offering);
        }

        let doc = DocRef::new(Offering::COLLECTION, offering_id)?;
        self.db.update_doc(&doc, &updates)?;
        Ok(offering)
    }

    /// Soft-deactivate an offering; offerings with history are never
    /// deleted.
    pub fn deactivate_offering(&self, offering_id: &str) -> Result<(), MarketError> {
        let doc = DocRef::new(Offering::COLLECTION, offering_id)?;
        self.db
            .update_doc(&doc, &[("isActive", FieldValue::set(false))])?;
        Ok(())
    }

    /// Active offerings for a calendar date (the browse view).
    pub fn offerings_for_date(&self, date: NaiveDate) -> Result<Vec<Offering>, MarketError> {
        let query = Query::collection(Offering::COLLECTION)?
            .where_eq("date", date.to_string())
            .where_eq("isActive", true)
            .order_by("itemName", Direction::Asc);
        collect(self.db.get_docs(&query)?)
    }

    /// All of a provider's offerings, newest date first (the dashboard view).
    pub fn offerings_for_provider(&self, provider_id: &str) -> Result<Vec<Offering>, MarketError> {
        let query = Query::collection(Offering::COLLECTION)?
            .where_eq("providerId", provider_id)
            .order_by("date", Direction::Desc);
        collect(self.db.get_docs(&query)?)
    }
}
