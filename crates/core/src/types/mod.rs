//! Domain types for Fairmarket.

pub mod auth;
pub mod category;
pub mod filter;
pub mod id;
pub mod product;

pub use auth::{Credentials, LoginTokens, Profile, RefreshToken};
pub use category::{Category, CategoryUpdate, NewCategory};
pub use filter::{PaginationFilter, ProductFilters};
pub use id::*;
pub use product::{NewProduct, Product, ProductCategory, ProductUpdate};
