//! The query layer: keys, cache, pagination, and the execution engine.
//!
//! Reads and writes against a repository go through [`engine::QueryClient`],
//! which adds caching with a staleness window, request coalescing,
//! retry with backoff, pagination cursoring, and an ordered
//! post-mutation pipeline (write-through, invalidate, notify).

pub mod cache;
pub mod engine;
pub mod key;
pub mod pagination;

pub use engine::{MutationKind, MutationOutcome, PageSnapshot, QueryClient, QueryOptions};
pub use key::{KeyArg, KeySegment, QueryKey};
pub use pagination::{DEFAULT_PAGE_LIMIT, INITIAL_PAGE, next_page_param, page_offset};
