//! List filters for paginated catalog reads.

use serde::{Deserialize, Serialize};

use super::id::CategoryId;

/// Offset/limit window for any paginated list resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl PaginationFilter {
    /// True when no field is set, i.e. the filter is the default window.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    /// Copy of this filter with the given offset/limit window applied.
    #[must_use]
    pub const fn with_window(&self, offset: u32, limit: u32) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
        }
    }
}

/// Search filters for the product catalog.
///
/// Field names follow the remote API's query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<u32>,
    #[serde(rename = "categoryId", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(rename = "categorySlug", skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ProductFilters {
    /// True when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.category_id.is_none()
            && self.category_slug.is_none()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    /// Copy of this filter with the given offset/limit window applied.
    #[must_use]
    pub fn with_window(&self, offset: u32, limit: u32) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters() {
        assert!(ProductFilters::default().is_empty());
        assert!(PaginationFilter::default().is_empty());

        let filters = ProductFilters {
            title: Some("shoes".to_string()),
            ..ProductFilters::default()
        };
        assert!(!filters.is_empty());
    }

    #[test]
    fn test_with_window_preserves_search_fields() {
        let filters = ProductFilters {
            title: Some("shoes".to_string()),
            ..ProductFilters::default()
        };
        let windowed = filters.with_window(20, 10);
        assert_eq!(windowed.title.as_deref(), Some("shoes"));
        assert_eq!(windowed.offset, Some(20));
        assert_eq!(windowed.limit, Some(10));
    }
}
