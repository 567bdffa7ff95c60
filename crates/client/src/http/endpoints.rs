//! Endpoint path construction.
//!
//! Query strings follow the remote API's `key=value&` convention: one
//! pair per significant filter field, values URL-encoded, insignificant
//! fields (absent, zero, empty) skipped entirely.

use fairmarket_core::types::filter::{PaginationFilter, ProductFilters};
use fairmarket_core::types::id::{CategoryId, ProductId};

pub const AUTH_LOGIN: &str = "auth/login";
pub const AUTH_REFRESH_TOKEN: &str = "auth/refresh-token";
pub const AUTH_PROFILE: &str = "auth/profile";

// =============================================================================
// Products
// =============================================================================

#[must_use]
pub fn products(filters: &ProductFilters) -> String {
    format!("products?{}", product_query(filters))
}

#[must_use]
pub fn product_by_id(id: ProductId) -> String {
    format!("products/{id}")
}

#[must_use]
pub fn product_by_slug(slug: &str) -> String {
    format!("products/slug/{}", urlencoding::encode(slug))
}

#[must_use]
pub fn related_products_by_id(id: ProductId) -> String {
    format!("products/{id}/related")
}

#[must_use]
pub fn related_products_by_slug(slug: &str) -> String {
    format!("products/slug/{}/related", urlencoding::encode(slug))
}

#[must_use]
pub const fn create_product() -> &'static str {
    "products"
}

#[must_use]
pub fn update_product(id: ProductId) -> String {
    format!("products/{id}")
}

#[must_use]
pub fn delete_product(id: ProductId) -> String {
    format!("products/{id}")
}

// =============================================================================
// Categories
// =============================================================================

#[must_use]
pub fn categories(filter: &PaginationFilter) -> String {
    format!("categories?{}", pagination_query(filter))
}

#[must_use]
pub fn category_by_id(id: CategoryId) -> String {
    format!("categories/{id}")
}

#[must_use]
pub fn category_by_slug(slug: &str) -> String {
    format!("categories/slug/{}", urlencoding::encode(slug))
}

#[must_use]
pub const fn create_category() -> &'static str {
    "categories"
}

#[must_use]
pub fn update_category(id: CategoryId) -> String {
    format!("categories/{id}")
}

#[must_use]
pub fn delete_category(id: CategoryId) -> String {
    format!("categories/{id}")
}

#[must_use]
pub fn products_by_category(id: CategoryId, filter: &PaginationFilter) -> String {
    format!("categories/{id}/products?{}", pagination_query(filter))
}

// =============================================================================
// Query-string helpers
// =============================================================================

/// One `key=value&` pair, or empty when the value is insignificant.
fn text_param(key: &str, value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => format!("{key}={}&", urlencoding::encode(v)),
        _ => String::new(),
    }
}

/// One `key=value&` pair for a number; zero is insignificant.
fn number_param(key: &str, value: Option<u32>) -> String {
    match value {
        Some(v) if v != 0 => format!("{key}={v}&"),
        _ => String::new(),
    }
}

/// One `key=value&` pair for an entity id; zero is insignificant.
fn id_param(key: &str, value: Option<i64>) -> String {
    match value {
        Some(v) if v != 0 => format!("{key}={v}&"),
        _ => String::new(),
    }
}

fn product_query(filters: &ProductFilters) -> String {
    let mut query = String::new();
    query.push_str(&text_param("title", filters.title.as_deref()));
    query.push_str(&number_param("price", filters.price));
    query.push_str(&number_param("price_min", filters.price_min));
    query.push_str(&number_param("price_max", filters.price_max));
    query.push_str(&id_param(
        "categoryId",
        filters.category_id.map(|id| id.as_i64()),
    ));
    query.push_str(&text_param("categorySlug", filters.category_slug.as_deref()));
    query.push_str(&number_param("limit", filters.limit));
    query.push_str(&number_param("offset", filters.offset));
    query
}

fn pagination_query(filter: &PaginationFilter) -> String {
    let mut query = String::new();
    query.push_str(&number_param("limit", filter.limit));
    query.push_str(&number_param("offset", filter.offset));
    query
}
