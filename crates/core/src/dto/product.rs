//! Product wire format.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::id::{CategoryId, ProductId};
use crate::types::product::{Product, ProductCategory};

/// A product as the remote API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDto {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price: f64,
    pub description: String,
    pub category: ProductCategoryDto,
    pub images: Vec<String>,
    #[serde(rename = "creationAt")]
    pub creation_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// The full category record embedded in a product response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCategoryDto {
    pub id: CategoryId,
    pub name: String,
    pub image: String,
    pub slug: String,
    #[serde(rename = "creationAt")]
    pub creation_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<ProductDto> for Product {
    fn from(dto: ProductDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            slug: dto.slug,
            price: dto.price,
            description: dto.description,
            category: ProductCategory {
                name: dto.category.name,
                image: dto.category.image,
            },
            images: dto.images,
        }
    }
}
