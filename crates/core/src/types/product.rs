//! Product entities and write payloads.

use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};

/// A catalog product as the client uses it.
///
/// This is the trimmed domain shape; the wire format with server-side
/// timestamps lives in [`crate::dto::ProductDto`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price: f64,
    pub description: String,
    pub category: ProductCategory,
    pub images: Vec<String>,
}

/// The category summary embedded in a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub name: String,
    pub image: String,
}

/// Payload for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub price: f64,
    pub description: String,
    #[serde(rename = "categoryId")]
    pub category_id: CategoryId,
    pub images: Vec<String>,
}

/// Partial payload for updating a product; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "categoryId", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_update_skips_absent_fields() {
        let update = ProductUpdate {
            price: Some(19.99),
            ..ProductUpdate::default()
        };
        let json = serde_json::to_value(&update).expect("serialize update");
        assert_eq!(json, serde_json::json!({ "price": 19.99 }));
    }
}
