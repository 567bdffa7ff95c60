//! Classified errors and the raw transport failures they derive from.
//!
//! Every failed remote call is funneled through the
//! [`registry::ErrorHandlerRegistry`] exactly once and surfaced as an
//! [`ApiError`]. Callers never see a raw transport error.

pub mod registry;

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

pub use registry::{Descriptor, ErrorHandlerRegistry, Handler, Resolution};

/// Result type alias for classified errors.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    NetworkError,
    Timeout,
    /// Failure matched no registered handler.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ServerError => "SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// The uniform error every remote-call failure classifies into.
///
/// Always derived from a [`RawFailure`] by the registry; never
/// constructed by UI code directly.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message from the matched handler or fallback.
    pub message: String,
    /// HTTP status of the failed response, when one was received.
    pub status_code: Option<u16>,
    /// Application or transport error code (body code wins).
    pub code: Option<String>,
    /// Classified kind.
    pub kind: ErrorKind,
    cause: Option<Arc<RawFailure>>,
}

impl ApiError {
    pub(crate) fn classified(
        message: impl Into<String>,
        kind: ErrorKind,
        cause: &RawFailure,
    ) -> Self {
        Self {
            message: message.into(),
            status_code: cause.status,
            code: cause.error_code(),
            kind,
            cause: Some(Arc::new(cause.clone())),
        }
    }

    /// The raw transport failure this error was classified from.
    #[must_use]
    pub fn cause(&self) -> Option<&RawFailure> {
        self.cause.as_deref()
    }
}

/// Error body shape the remote API attaches to failed responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub description: Option<String>,
    pub status: Option<u16>,
}

/// A raw failure from the network boundary, before classification.
#[derive(Debug, Clone)]
pub struct RawFailure {
    /// Error name (e.g. `HttpError`, `ParseError`).
    pub name: Option<String>,
    /// Transport-level code (`ERR_NETWORK`, `ERR_TIMEOUT`).
    pub transport_code: Option<String>,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Parsed error body, when the response carried one.
    pub body: Option<ErrorBody>,
    /// Raw message for the unclassified fallback.
    pub message: String,
}

impl RawFailure {
    /// Failure for a non-success HTTP response.
    #[must_use]
    pub fn from_status(status: u16, body: Option<ErrorBody>) -> Self {
        Self {
            name: Some("HttpError".to_string()),
            transport_code: None,
            status: Some(status),
            body,
            message: format!("HTTP {status}"),
        }
    }

    /// Failure below the HTTP layer (connect, timeout, DNS).
    #[must_use]
    pub fn transport(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some("TransportError".to_string()),
            transport_code: Some(code.into()),
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// Failure local to the client (URL construction, body decoding).
    #[must_use]
    pub fn local(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            transport_code: None,
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// Seek keys for registry lookup, most specific first:
    /// body code, transport code, error name, body status, HTTP status.
    #[must_use]
    pub fn seek_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(5);
        if let Some(code) = self.body.as_ref().and_then(|b| b.code.as_ref()) {
            keys.push(code.clone());
        }
        if let Some(code) = &self.transport_code {
            keys.push(code.clone());
        }
        if let Some(name) = &self.name {
            keys.push(name.clone());
        }
        if let Some(status) = self.body.as_ref().and_then(|b| b.status) {
            keys.push(status.to_string());
        }
        if let Some(status) = self.status {
            keys.push(status.to_string());
        }
        keys
    }

    /// The code carried into the classified error: body code first,
    /// then the transport code.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|b| b.code.clone())
            .or_else(|| self.transport_code.clone())
    }
}
