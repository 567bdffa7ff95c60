//! Local stores: the client-side mirror of server state.
//!
//! Each store holds one slice of state behind a lock, persists a
//! partial snapshot through a [`persist::StorageProvider`], and
//! rehydrates from it on construction. Stores never talk to the
//! network; the managers write fetched data into them.

pub mod auth;
pub mod category;
pub mod persist;
pub mod product;

pub use auth::AuthStore;
pub use category::CategoryStore;
pub use persist::{FileStorage, MemoryStorage, StorageError, StorageProvider};
pub use product::ProductStore;

use thiserror::Error;

/// Failure writing to or snapshotting a local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A create collided with an existing record.
    #[error("a record with id {id} already exists")]
    Conflict { id: i64 },

    /// A snapshot could not be serialized or deserialized.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
