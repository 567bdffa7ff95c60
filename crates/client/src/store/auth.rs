//! Auth store.
//!
//! Holds the session token pair and the signed-in profile. The whole
//! state persists so a restart resumes the session; tokens are wrapped
//! in [`SecretString`] in memory and only exposed when serializing the
//! snapshot itself.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use fairmarket_core::types::auth::{LoginTokens, Profile};
use secrecy::{ExposeSecret, SecretString};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use super::StoreError;
use super::persist::StorageProvider;

const STORE_NAME: &str = "auth-store";

#[derive(Default)]
struct AuthState {
    tokens: Option<LoginTokens>,
    profile: Option<Profile>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct AuthSnapshot {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    profile: Option<Profile>,
    last_updated: Option<DateTime<Utc>>,
}

// Serialized by hand so the token fields carry their plain values;
// `SecretString` itself refuses to serialize.
impl Serialize for AuthSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AuthSnapshot", 4)?;
        s.serialize_field(
            "access_token",
            &self.access_token.as_ref().map(ExposeSecret::expose_secret),
        )?;
        s.serialize_field(
            "refresh_token",
            &self.refresh_token.as_ref().map(ExposeSecret::expose_secret),
        )?;
        s.serialize_field("profile", &self.profile)?;
        s.serialize_field("last_updated", &self.last_updated)?;
        s.end()
    }
}

pub struct AuthStore {
    state: RwLock<AuthState>,
    storage: Arc<dyn StorageProvider>,
}

impl AuthStore {
    /// Create the store, resuming the persisted session if one exists.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        let mut state = AuthState::default();
        match storage.get(STORE_NAME) {
            Ok(Some(raw)) => match serde_json::from_str::<AuthSnapshot>(&raw) {
                Ok(snapshot) => {
                    if let (Some(access), Some(refresh)) =
                        (snapshot.access_token, snapshot.refresh_token)
                    {
                        state.tokens = Some(LoginTokens {
                            access_token: access,
                            refresh_token: refresh,
                        });
                    }
                    state.profile = snapshot.profile;
                    state.last_updated = snapshot.last_updated;
                }
                Err(e) => warn!(store = STORE_NAME, error = %e, "discarding corrupt snapshot"),
            },
            Ok(None) => {}
            Err(e) => warn!(store = STORE_NAME, error = %e, "failed to read snapshot"),
        }
        Self {
            state: RwLock::new(state),
            storage,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read().tokens.as_ref().map(|t| t.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read().tokens.as_ref().map(|t| t.refresh_token.clone())
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().tokens.is_some()
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().last_updated
    }

    /// Install a new token pair from login or refresh.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn set_tokens(&self, tokens: LoginTokens) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            state.tokens = Some(tokens);
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// Record the signed-in profile.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn set_profile(&self, profile: Profile) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            state.profile = Some(profile);
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// End the session, dropping tokens, profile, and the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        *self.write() = AuthState::default();
        self.storage.remove(STORE_NAME)?;
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = {
            let state = self.read();
            AuthSnapshot {
                access_token: state.tokens.as_ref().map(|t| t.access_token.clone()),
                refresh_token: state.tokens.as_ref().map(|t| t.refresh_token.clone()),
                profile: state.profile.clone(),
                last_updated: state.last_updated,
            }
        };
        let raw = serde_json::to_string(&snapshot)?;
        self.storage.set(STORE_NAME, &raw)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AuthState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AuthState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::super::persist::MemoryStorage;
    use super::*;

    fn tokens() -> LoginTokens {
        LoginTokens {
            access_token: SecretString::from("access-abc"),
            refresh_token: SecretString::from("refresh-xyz"),
        }
    }

    #[test]
    fn test_session_survives_rehydration() {
        let storage = Arc::new(MemoryStorage::new());
        let store = AuthStore::new(Arc::clone(&storage) as Arc<dyn StorageProvider>);
        store.set_tokens(tokens()).unwrap();

        let rehydrated = AuthStore::new(storage);
        assert!(rehydrated.is_authenticated());
        assert_eq!(
            rehydrated.access_token().unwrap().expose_secret(),
            "access-abc"
        );
        assert!(rehydrated.last_updated().is_some());
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = AuthStore::new(Arc::clone(&storage) as Arc<dyn StorageProvider>);
        store.set_tokens(tokens()).unwrap();
        store.clear().unwrap();

        assert!(!store.is_authenticated());
        assert!(storage.get(STORE_NAME).unwrap().is_none());
    }
}
