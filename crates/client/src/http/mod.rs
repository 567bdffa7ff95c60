//! HTTP boundary: a thin JSON client over `reqwest`.
//!
//! Every failure - transport error, non-success status, or body decode
//! failure - is converted into a [`RawFailure`] and classified through
//! the registry exactly once. Callers only ever see [`ApiError`].

pub mod endpoints;

use std::sync::{Arc, RwLock};

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{AppConfig, ConfigError};
use crate::error::{ApiError, ErrorBody, ErrorHandlerRegistry, RawFailure, Result};

/// JSON API client with a fixed base URL and request timeout.
///
/// Cheap to clone; all clones share the connection pool, the handler
/// registry, and the bearer token slot.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    registry: Arc<ErrorHandlerRegistry>,
    bearer_token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        config: &AppConfig,
        registry: Arc<ErrorHandlerRegistry>,
    ) -> std::result::Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                registry,
                bearer_token: RwLock::new(None),
            }),
        })
    }

    /// Install or clear the bearer token attached to every request.
    pub fn set_bearer_token(&self, token: Option<SecretString>) {
        if let Ok(mut slot) = self.inner.bearer_token.write() {
            *slot = token;
        }
    }

    /// The registry used to classify failures from this client.
    #[must_use]
    pub fn registry(&self) -> &Arc<ErrorHandlerRegistry> {
        &self.inner.registry
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any transport or HTTP failure.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, None::<&()>).await
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any transport or HTTP failure.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(Method::POST, path, Some(body)).await
    }

    /// `PUT` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any transport or HTTP failure.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// `DELETE` a resource and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any transport or HTTP failure.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::DELETE, path, None::<&()>).await
    }

    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.inner.base_url.join(path).map_err(|e| {
            self.classify(&RawFailure::local("InvalidUrl", e.to_string()))
        })?;

        let mut request = self.inner.client.request(method, url);
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify(&raw_from_reqwest(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify(&raw_from_reqwest(&e)))?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %text.chars().take(200).collect::<String>(),
                "request failed"
            );
            let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
            return Err(self.classify(&RawFailure::from_status(status.as_u16(), body)));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(200).collect::<String>(),
                "failed to decode response body"
            );
            self.classify(&RawFailure::local("ParseError", e.to_string()))
        })
    }

    fn bearer_token(&self) -> Option<SecretString> {
        self.inner
            .bearer_token
            .read()
            .ok()
            .and_then(|slot| slot.clone())
    }

    fn classify(&self, raw: &RawFailure) -> ApiError {
        self.inner.registry.classify(raw)
    }
}

/// Map a `reqwest` failure onto the transport-code vocabulary the
/// registry understands.
fn raw_from_reqwest(error: &reqwest::Error) -> RawFailure {
    if error.is_timeout() {
        return RawFailure::transport("ERR_TIMEOUT", error.to_string());
    }
    if error.is_connect() || error.is_request() {
        return RawFailure::transport("ERR_NETWORK", error.to_string());
    }
    RawFailure {
        name: Some("TransportError".to_string()),
        transport_code: None,
        status: error.status().map(|s| s.as_u16()),
        body: None,
        message: error.to_string(),
    }
}
