//! Authentication data access.

use fairmarket_core::types::auth::{Credentials, LoginTokens, Profile, RefreshToken};

use crate::error::Result;
use crate::http::{ApiClient, endpoints};

/// Remote authentication operations.
///
/// `profile` relies on the bearer token the shared [`ApiClient`]
/// carries; there is no per-call token parameter.
pub trait AuthRepository: Send + Sync {
    fn login(&self, credentials: &Credentials) -> impl Future<Output = Result<LoginTokens>> + Send;
    fn refresh(&self, token: &RefreshToken) -> impl Future<Output = Result<LoginTokens>> + Send;
    fn profile(&self) -> impl Future<Output = Result<Profile>> + Send;
}

/// [`AuthRepository`] over the remote JSON API.
#[derive(Clone)]
pub struct HttpAuthRepository {
    api: ApiClient,
}

impl HttpAuthRepository {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl AuthRepository for HttpAuthRepository {
    async fn login(&self, credentials: &Credentials) -> Result<LoginTokens> {
        self.api.post(endpoints::AUTH_LOGIN, credentials).await
    }

    async fn refresh(&self, token: &RefreshToken) -> Result<LoginTokens> {
        self.api.post(endpoints::AUTH_REFRESH_TOKEN, token).await
    }

    async fn profile(&self) -> Result<Profile> {
        self.api.get(endpoints::AUTH_PROFILE).await
    }
}
