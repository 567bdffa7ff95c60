//! Fairmarket storefront client library.
//!
//! Authenticates a user, lists and searches the paginated product
//! catalog, and fetches product detail with related items. The heart
//! of the crate is a generic query layer that wraps every remote read
//! and write with caching, pagination cursoring, local-store
//! synchronization, and centralized error classification.
//!
//! # Layers
//!
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Classified errors and the handler registry
//! - [`http`] - The JSON API boundary (`reqwest`)
//! - [`query`] - Query keys, cache, pagination, and the execution engine
//! - [`store`] - Domain-scoped local stores with snapshot persistence
//! - [`repository`] - Per-domain remote data access traits
//! - [`manager`] - Query-binding layer tying the above together
//! - [`context`] - One-shot application wiring (no global singletons)
//!
//! # Example
//!
//! ```rust,ignore
//! use fairmarket_client::context::AppContext;
//! use fairmarket_client::config::AppConfig;
//! use fairmarket_client::store::persist::MemoryStorage;
//! use std::sync::Arc;
//!
//! let config = AppConfig::from_env()?;
//! let (ctx, _session_events) = AppContext::new(config, Arc::new(MemoryStorage::new()))?;
//!
//! let first_page = ctx.products.get_all_products(None).await?;
//! let product = ctx.products.get_product_by_slug("classic-shoes").await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod manager;
pub mod query;
pub mod repository;
pub mod store;

pub use error::{ApiError, ErrorKind};
pub use query::engine::QueryClient;
