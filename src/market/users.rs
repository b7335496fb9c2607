//! User and provider-profile operations.

use crate::store::{to_document, DocRef, FieldValue};

use super::models::{ProviderProfile, User};
use super::{not_found, MarketError, Marketplace};

impl Marketplace {
    /// Upsert a user record keyed by its uid.
    pub fn register_user(&self, user: &User) -> Result<(), MarketError> {
        let doc = DocRef::new(User::COLLECTION, &user.uid)?;
        self.db.set_doc(&doc, to_document(user)?)?;
        Ok(())
    }

    pub fn get_user(&self, uid: &str) -> Result<Option<User>, MarketError> {
        let doc = DocRef::new(User::COLLECTION, uid)?;
        match self.db.get_doc(&doc)? {
            Some(snap) => Ok(Some(snap.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Upsert the provider profile keyed by the provider's uid.
    pub fn create_provider_profile(&self, profile: &ProviderProfile) -> Result<(), MarketError> {
        let doc = DocRef::new(ProviderProfile::COLLECTION, &profile.provider_id)?;
        self.db.set_doc(&doc, to_document(profile)?)?;
        Ok(())
    }

    pub fn get_provider_profile(
        &self,
        provider_id: &str,
    ) -> Result<Option<ProviderProfile>, MarketError> {
        let doc = DocRef::new(ProviderProfile::COLLECTION, provider_id)?;
        match self.db.get_doc(&doc)? {
            Some(snap) => Ok(Some(snap.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Bump the provider's follower counter.
    pub fn follow_provider(&self, provider_id: &str) -> Result<(), MarketError> {
        let doc = DocRef::new(ProviderProfile::COLLECTION, provider_id)?;
        self.db
            .update_doc(&doc, &[("followersCount", FieldValue::increment(1))])?;
        Ok(())
    }

    /// Append a category to the provider's saved list. Duplicates are
    /// dropped; order is preserved.
    pub fn save_category(&self, provider_id: &str, category: &str) -> Result<(), MarketError> {
        let profile = self
            .get_provider_profile(provider_id)?
            .ok_or_else(|| not_found(ProviderProfile::COLLECTION, provider_id))?;
        let mut categories = profile.saved_categories.unwrap_or_default();
        if categories.iter().any(|c| c == category) {
            return Ok(());
        }
        categories.push(category.to_string());

        let doc = DocRef::new(ProviderProfile::COLLECTION, provider_id)?;
        self.db
            .update_doc(&doc, &[("savedCategories", FieldValue::set(categories))])?;
        Ok(())
    }
}
