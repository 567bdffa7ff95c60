//! Fairmarket Core - Shared domain types.
//!
//! This crate provides the domain model shared by every Fairmarket
//! component: products, categories, authentication, and the list
//! filters used for catalog queries.
//!
//! # Architecture
//!
//! The core crate contains only types and conversions - no I/O, no
//! HTTP clients, no storage access. This keeps it lightweight and
//! allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Domain entities, type-safe IDs, and list filters
//! - [`dto`] - Wire-format shapes and their conversions into entities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod dto;
pub mod types;

pub use types::*;
