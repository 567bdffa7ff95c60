//! Wire-format shapes returned by the remote API.
//!
//! DTOs carry server-side fields (timestamps, embedded full category)
//! that the domain entities drop. Conversions into entities are
//! lossy on purpose: callers only ever see the domain shape.

pub mod category;
pub mod product;

pub use category::CategoryDto;
pub use product::ProductDto;
