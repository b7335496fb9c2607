//! Session store - the persisted current-identity record.
//!
//! The protocol layer never reads this implicitly; callers pass identities
//! as explicit parameters. The record lives under its own well-known key
//! next to the collections snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{DurableStore, SESSION_KEY};

/// The signed-in identity as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub photo_url: Option<String>,
}

/// Reads and writes the current session record.
pub struct SessionStore {
    store: DurableStore,
}

impl SessionStore {
    pub fn new(store: DurableStore) -> Self {
        SessionStore { store }
    }

    /// The current identity, or `None` when signed out.
    pub fn current(&self) -> Result<Option<SessionUser>, StoreError> {
        match self.store.load(SESSION_KEY)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Serde(e.to_string())),
        }
    }

    pub fn sign_in(&self, user: &SessionUser) -> Result<(), StoreError> {
        let value = serde_json::to_value(user).map_err(|e| StoreError::Serde(e.to_string()))?;
        self.store.save(SESSION_KEY, &value)
    }

    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.store.save(SESSION_KEY, &Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            uid: "u1".into(),
            email: "u1@example.com".into(),
            display_name: "User One".into(),
            photo_url: None,
        }
    }

    #[test]
    fn starts_signed_out() {
        let sessions = SessionStore::new(DurableStore::in_memory());
        assert_eq!(sessions.current().unwrap(), None);
    }

    #[test]
    fn sign_in_round_trips() {
        let sessions = SessionStore::new(DurableStore::in_memory());
        sessions.sign_in(&user()).unwrap();
        assert_eq!(sessions.current().unwrap(), Some(user()));
    }

    #[test]
    fn sign_out_clears() {
        let sessions = SessionStore::new(DurableStore::in_memory());
        sessions.sign_in(&user()).unwrap();
        sessions.sign_out().unwrap();
        assert_eq!(sessions.current().unwrap(), None);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        SessionStore::new(DurableStore::at(dir.path()))
            .sign_in(&user())
            .unwrap();

        let reopened = SessionStore::new(DurableStore::at(dir.path()));
        assert_eq!(reopened.current().unwrap(), Some(user()));
    }
}
