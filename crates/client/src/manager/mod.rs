//! Managers: the operations the app calls.
//!
//! A manager ties one repository to the query engine and a local
//! store. Reads go through the cache and sync fetched data into the
//! store; writes run the mutation pipeline with each operation's
//! invalidation set. Key builders live alongside each manager so the
//! read keys and the invalidation keys cannot drift apart.

pub mod auth;
pub mod category;
pub mod product;

pub use auth::AuthManager;
pub use auth::keys as auth_keys;
pub use category::CategoryManager;
pub use category::keys as category_keys;
pub use product::ProductManager;
pub use product::keys as product_keys;

use tracing::warn;

use crate::store::StoreError;

/// Log a failed store sync without failing the read that produced it.
/// The fetched data is already in the cache and on its way to the
/// caller; the store is a mirror, not the source of truth.
pub(crate) fn report_sync(result: Result<(), StoreError>) {
    if let Err(error) = result {
        warn!(error = %error, "local store sync failed");
    }
}
