//! Application context: one place that wires every layer together.
//!
//! Construction order matters: registry, HTTP client, query engine,
//! stores, then managers. Nothing reaches for a global; anything that
//! needs a collaborator receives it here.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::{AppConfig, ConfigError};
use crate::error::{Descriptor, ErrorHandlerRegistry, ErrorKind, Handler};
use crate::http::ApiClient;
use crate::manager::{AuthManager, CategoryManager, ProductManager};
use crate::query::{QueryClient, QueryOptions};
use crate::repository::{HttpAuthRepository, HttpCategoryRepository, HttpProductRepository};
use crate::store::{
    AuthStore, CategoryStore, FileStorage, MemoryStorage, ProductStore, StorageError,
    StorageProvider,
};

/// Session-level events surfaced to the app shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request came back 401; the session needs re-authentication.
    Unauthorized,
}

/// The wired application: config, engine, and one manager per domain.
pub struct AppContext {
    pub config: AppConfig,
    pub queries: QueryClient,
    pub api: ApiClient,
    pub products: ProductManager<HttpProductRepository>,
    pub categories: CategoryManager<HttpCategoryRepository>,
    pub auth: AuthManager<HttpAuthRepository>,
}

impl AppContext {
    /// Wire the full context over the given snapshot storage.
    ///
    /// Returns the context plus the receiving end of the session event
    /// channel; the app shell listens on it to route to the login
    /// screen when a request comes back unauthorized.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn StorageProvider>,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>), ConfigError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let registry = Arc::new(build_registry(&events_tx));
        let api = ApiClient::new(&config, registry)?;
        let queries = QueryClient::new(QueryOptions {
            stale_time: config.stale_time,
            retry: config.retry,
            ..QueryOptions::default()
        });

        let product_store = Arc::new(ProductStore::new(Arc::clone(&storage)));
        let category_store = Arc::new(CategoryStore::new(Arc::clone(&storage)));
        let auth_store = Arc::new(AuthStore::new(storage));

        let products = ProductManager::new(
            HttpProductRepository::new(api.clone()),
            queries.clone(),
            product_store,
            config.page_limit,
        );
        let categories = CategoryManager::new(
            HttpCategoryRepository::new(api.clone()),
            queries.clone(),
            category_store,
            config.page_limit,
        );
        let auth = AuthManager::new(
            HttpAuthRepository::new(api.clone()),
            queries.clone(),
            auth_store,
            api.clone(),
        );

        let context = Self {
            config,
            queries,
            api,
            products,
            categories,
            auth,
        };
        Ok((context, events_rx))
    }

    /// Pick the snapshot storage the config asks for: file-backed when
    /// a storage directory is set, in-memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the storage directory cannot be created.
    pub fn storage_for(config: &AppConfig) -> Result<Arc<dyn StorageProvider>, StorageError> {
        match &config.storage_dir {
            Some(dir) => Ok(Arc::new(FileStorage::new(dir)?)),
            None => Ok(Arc::new(MemoryStorage::new())),
        }
    }
}

/// Default handlers plus a 401 override that pushes a session event.
fn build_registry(events: &UnboundedSender<SessionEvent>) -> ErrorHandlerRegistry {
    let parent = Arc::new(ErrorHandlerRegistry::with_defaults());
    let registry = ErrorHandlerRegistry::with_parent(parent);
    let events = events.clone();
    registry.register(
        "401",
        Handler::Descriptor(
            Descriptor::new(
                "Authentication required. Please log in again.",
                ErrorKind::Unauthorized,
            )
            .with_after(move |_| {
                // The receiver may be gone during shutdown.
                let _ = events.send(SessionEvent::Unauthorized);
            }),
        ),
    );
    registry
}
