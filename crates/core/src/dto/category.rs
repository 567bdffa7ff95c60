//! Category wire format.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::category::Category;
use crate::types::id::CategoryId;

/// A category as the remote API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDto {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub image: String,
    #[serde(rename = "creationAt")]
    pub creation_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryDto> for Category {
    fn from(dto: CategoryDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            slug: dto.slug,
            image: dto.image,
        }
    }
}
