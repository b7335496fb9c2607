#![allow(dead_code)]

use bazaar_rust::{CatalogItem, Database, Marketplace, Offering};
use chrono::NaiveDate;

pub fn market() -> Marketplace {
    Marketplace::new(Database::in_memory())
}

pub fn offering_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
}

/// Seed a provider's catalog item plus one offering of it.
pub fn seed_offering(
    market: &Marketplace,
    provider: &str,
    name: &str,
    price: f64,
    quantity: i64,
) -> Offering {
    let item = market
        .create_catalog_item(CatalogItem {
            id: String::new(),
            provider_id: provider.into(),
            name: name.into(),
            description: "surplus stock".into(),
            price_default: price,
            currency: "EUR".into(),
            category: "bakery".into(),
            image_url: None,
            is_active: true,
            created_at: None,
        })
        .expect("create catalog item");
    market
        .create_offering(&item.id, price, quantity, offering_date())
        .expect("create offering")
}
