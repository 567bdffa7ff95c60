//! Two-level error handler registry.
//!
//! A registry maps seek keys (application codes, transport codes,
//! error names, HTTP statuses) to handlers. A local registry can layer
//! on top of a shared parent without mutating it; lookups check the
//! child first, then the parent. Classification walks a failure's seek
//! keys in order and the first match wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::{ApiError, ErrorKind, RawFailure};

/// Hook invoked around classification with the raw failure.
pub type Hook = Arc<dyn Fn(&RawFailure) + Send + Sync>;

/// Dynamic handler: inspects the failure and produces a resolution,
/// or `None` to fall through to the next seek key.
pub type Resolver = Arc<dyn Fn(&RawFailure) -> Option<Resolution> + Send + Sync>;

/// A registered handler entry.
///
/// The three cases mirror the three shapes a handler can take: a bare
/// message, a full descriptor, or a function resolving either at
/// lookup time.
#[derive(Clone)]
pub enum Handler {
    /// Bare message; classifies with [`ErrorKind::Unknown`].
    Message(String),
    /// Message, kind, and optional before/after hooks.
    Descriptor(Descriptor),
    /// Resolved dynamically against the concrete failure.
    Resolver(Resolver),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(msg) => f.debug_tuple("Message").field(msg).finish(),
            Self::Descriptor(desc) => f.debug_tuple("Descriptor").field(desc).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// What a [`Handler::Resolver`] produces.
#[derive(Clone)]
pub enum Resolution {
    Message(String),
    Descriptor(Descriptor),
}

/// Full handler description.
#[derive(Clone)]
pub struct Descriptor {
    pub message: String,
    pub kind: ErrorKind,
    /// Runs synchronously before the classified error is built.
    pub before: Option<Hook>,
    /// Spawned asynchronously after classification (e.g. to trigger
    /// re-authentication on `UNAUTHORIZED`).
    pub after: Option<Hook>,
}

impl Descriptor {
    /// Descriptor with a message and kind, no hooks.
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            before: None,
            after: None,
        }
    }

    /// Attach a synchronous pre-classification hook.
    #[must_use]
    pub fn with_before(mut self, hook: impl Fn(&RawFailure) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Attach an asynchronous post-classification hook.
    #[must_use]
    pub fn with_after(mut self, hook: impl Fn(&RawFailure) + Send + Sync + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("before", &self.before.as_ref().map(|_| ".."))
            .field("after", &self.after.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Registry of error handlers with optional parent fallback.
pub struct ErrorHandlerRegistry {
    handlers: RwLock<HashMap<String, Handler>>,
    parent: Option<Arc<ErrorHandlerRegistry>>,
}

impl ErrorHandlerRegistry {
    /// Empty registry with no parent.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            parent: None,
        }
    }

    /// Empty registry that falls back to `parent` on lookup misses.
    #[must_use]
    pub fn with_parent(parent: Arc<Self>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Registry preloaded with the default handler table:
    /// 400/401/403/404/500 plus `ERR_NETWORK` and `ERR_TIMEOUT`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(
            "400",
            Handler::Descriptor(Descriptor::new(
                "Bad request. Please check your input.",
                ErrorKind::BadRequest,
            )),
        );
        registry.register(
            "401",
            Handler::Descriptor(
                Descriptor::new(
                    "Authentication required. Please log in again.",
                    ErrorKind::Unauthorized,
                )
                .with_after(|_| {
                    warn!("unauthorized response; re-authentication required");
                }),
            ),
        );
        registry.register(
            "403",
            Handler::Descriptor(Descriptor::new(
                "Access forbidden. You don't have permission.",
                ErrorKind::Forbidden,
            )),
        );
        registry.register(
            "404",
            Handler::Descriptor(Descriptor::new("Resource not found.", ErrorKind::NotFound)),
        );
        registry.register(
            "500",
            Handler::Descriptor(Descriptor::new(
                "Server error. Please try again later.",
                ErrorKind::ServerError,
            )),
        );
        registry.register(
            "ERR_NETWORK",
            Handler::Descriptor(Descriptor::new(
                "Network error. Please check your connection.",
                ErrorKind::NetworkError,
            )),
        );
        registry.register(
            "ERR_TIMEOUT",
            Handler::Descriptor(Descriptor::new(
                "Request timeout. Please try again.",
                ErrorKind::Timeout,
            )),
        );
        registry
    }

    /// Register a handler under a seek key, replacing any existing one.
    pub fn register(&self, key: impl Into<String>, handler: Handler) {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.insert(key.into(), handler);
        }
    }

    /// Register several handlers at once.
    pub fn register_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Handler)>,
    {
        for (key, handler) in entries {
            self.register(key, handler);
        }
    }

    /// Remove a handler from this registry (parents are untouched).
    pub fn unregister(&self, key: &str) {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.remove(key);
        }
    }

    /// Look up a handler: this registry first, then the parent chain.
    #[must_use]
    pub fn find(&self, seek: &str) -> Option<Handler> {
        let local = self
            .handlers
            .read()
            .ok()
            .and_then(|handlers| handlers.get(seek).cloned());
        local.or_else(|| self.parent.as_ref().and_then(|parent| parent.find(seek)))
    }

    /// Classify a raw failure into exactly one [`ApiError`].
    ///
    /// Walks the failure's seek keys in order; the first handler that
    /// produces a resolution wins. When nothing matches, falls back to
    /// the response body description, then the raw message, then a
    /// generic `Error <status|unknown>`.
    #[must_use]
    pub fn classify(&self, raw: &RawFailure) -> ApiError {
        for key in raw.seek_keys() {
            let Some(handler) = self.find(&key) else {
                continue;
            };
            debug!(seek = %key, "error handler matched");
            let resolution = match handler {
                Handler::Message(message) => Some(Resolution::Message(message)),
                Handler::Descriptor(descriptor) => Some(Resolution::Descriptor(descriptor)),
                Handler::Resolver(resolver) => resolver(raw),
            };
            if let Some(resolution) = resolution {
                return Self::build(resolution, raw);
            }
        }
        Self::fallback(raw)
    }

    fn build(resolution: Resolution, raw: &RawFailure) -> ApiError {
        let descriptor = match resolution {
            Resolution::Message(message) => Descriptor::new(message, ErrorKind::Unknown),
            Resolution::Descriptor(descriptor) => descriptor,
        };

        if let Some(before) = &descriptor.before {
            before(raw);
        }

        let error = ApiError::classified(descriptor.message.clone(), descriptor.kind, raw);

        if let Some(after) = descriptor.after.clone() {
            let raw = raw.clone();
            tokio::spawn(async move {
                after(&raw);
            });
        }

        error
    }

    fn fallback(raw: &RawFailure) -> ApiError {
        let body = raw.body.as_ref();
        if let (Some(_), Some(description)) =
            (body.and_then(|b| b.code.as_ref()), body.and_then(|b| b.description.clone()))
        {
            return ApiError::classified(description, ErrorKind::Unknown, raw);
        }

        let message = body
            .and_then(|b| b.description.clone())
            .or_else(|| (!raw.message.is_empty()).then(|| raw.message.clone()))
            .unwrap_or_else(|| match raw.status {
                Some(status) => format!("Error {status}"),
                None => "Error unknown".to_string(),
            });
        ApiError::classified(message, ErrorKind::Unknown, raw)
    }
}

impl Default for ErrorHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
