//! Remote data access.
//!
//! Repositories own path construction and the wire-to-domain mapping;
//! nothing above this layer sees a DTO. Each trait has one HTTP
//! implementation over [`crate::http::ApiClient`]; tests substitute
//! their own implementations.

pub mod auth;
pub mod category;
pub mod product;

pub use auth::{AuthRepository, HttpAuthRepository};
pub use category::{CategoryRepository, HttpCategoryRepository};
pub use product::{HttpProductRepository, ProductRepository};
