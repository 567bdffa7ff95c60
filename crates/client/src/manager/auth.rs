//! Session operations.

use std::sync::Arc;

use fairmarket_core::types::auth::{Credentials, LoginTokens, Profile, RefreshToken};
use tracing::info;

use super::report_sync;
use crate::error::{ApiError, ErrorKind, RawFailure, Result};
use crate::http::ApiClient;
use crate::query::{MutationKind, QueryClient};
use crate::repository::AuthRepository;
use crate::store::{AuthStore, StoreError};

/// Cache keys for session reads.
pub mod keys {
    use crate::query::QueryKey;

    #[must_use]
    pub fn get_profile() -> QueryKey {
        QueryKey::new("getProfile")
    }
}

pub struct AuthManager<R> {
    repo: R,
    queries: QueryClient,
    store: Arc<AuthStore>,
    api: ApiClient,
}

impl<R: AuthRepository> AuthManager<R> {
    /// Create the manager, resuming a persisted session by installing
    /// its bearer token on the shared client.
    #[must_use]
    pub fn new(repo: R, queries: QueryClient, store: Arc<AuthStore>, api: ApiClient) -> Self {
        if let Some(token) = store.access_token() {
            api.set_bearer_token(Some(token));
        }
        Self {
            repo,
            queries,
            store,
            api,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Sign in, then fetch and return the signed-in profile.
    ///
    /// Not retried: repeated failed attempts against an auth endpoint
    /// risk tripping a lockout.
    ///
    /// # Errors
    ///
    /// Returns the classified error when login or the follow-up profile
    /// fetch fails.
    pub async fn login(&self, credentials: Credentials) -> Result<Profile> {
        let store = Arc::clone(&self.store);
        let api = self.api.clone();
        self.queries
            .mutation(
                MutationKind::NonIdempotent,
                credentials,
                |c| async move { self.repo.login(&c).await },
                move |tokens: &LoginTokens, _| store.set_tokens(tokens.clone()),
                &[keys::get_profile()],
                move |tokens, c: &Credentials| {
                    api.set_bearer_token(Some(tokens.access_token.clone()));
                    info!(email = %c.email, "signed in");
                },
            )
            .await?;
        let profile = self.get_profile().await?;
        Ok((*profile).clone())
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error when no session is stored, or the
    /// classified error when the exchange fails.
    pub async fn refresh_token(&self) -> Result<()> {
        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(ApiError::classified(
                "No refresh token available.",
                ErrorKind::Unauthorized,
                &RawFailure::local("MissingRefreshToken", "no stored session"),
            ));
        };

        let store = Arc::clone(&self.store);
        let api = self.api.clone();
        self.queries
            .mutation(
                MutationKind::Idempotent,
                RefreshToken { refresh_token },
                |t| async move { self.repo.refresh(&t).await },
                move |tokens: &LoginTokens, _| store.set_tokens(tokens.clone()),
                &[keys::get_profile()],
                move |tokens, _| {
                    api.set_bearer_token(Some(tokens.access_token.clone()));
                    info!("session refreshed");
                },
            )
            .await?;
        Ok(())
    }

    /// The signed-in user's profile, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_profile(&self) -> Result<Arc<Profile>> {
        let store = Arc::clone(&self.store);
        self.queries
            .query(
                keys::get_profile(),
                || self.repo.profile(),
                move |profile| report_sync(store.set_profile(profile.clone())),
            )
            .await
    }

    /// Sign out: drop the session, the bearer token, and every cached
    /// query result.
    ///
    /// # Errors
    ///
    /// Returns an error when the persisted session cannot be removed;
    /// the in-memory session and cache are cleared regardless.
    pub async fn logout(&self) -> std::result::Result<(), StoreError> {
        self.api.set_bearer_token(None);
        self.queries.clear().await;
        let result = self.store.clear();
        info!("signed out");
        result
    }
}
