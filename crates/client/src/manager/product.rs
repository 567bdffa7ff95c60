//! Product operations.

use std::sync::Arc;

use fairmarket_core::types::filter::ProductFilters;
use fairmarket_core::types::id::{IdOrSlug, ProductId};
use fairmarket_core::types::product::{NewProduct, Product, ProductUpdate};
use tracing::info;

use super::report_sync;
use crate::error::Result;
use crate::query::{
    MutationKind, MutationOutcome, PageSnapshot, QueryClient, next_page_param, page_offset,
};
use crate::repository::ProductRepository;
use crate::store::ProductStore;

/// Cache keys for product reads.
///
/// Arguments are optional so the same builder yields both the exact
/// key for a read and the bare prefix for invalidating every cached
/// argument combination.
pub mod keys {
    use super::{ProductFilters, ProductId};
    use crate::query::QueryKey;

    #[must_use]
    pub fn get_all_products(filters: Option<&ProductFilters>) -> QueryKey {
        QueryKey::new("getAllProducts").with(&filters)
    }

    #[must_use]
    pub fn get_product_by_id(id: Option<ProductId>) -> QueryKey {
        QueryKey::new("getProductById").with(&id)
    }

    #[must_use]
    pub fn get_product_by_slug(slug: Option<&str>) -> QueryKey {
        QueryKey::new("getProductBySlug").with(&slug)
    }

    #[must_use]
    pub fn get_related_products_by_id(id: Option<ProductId>) -> QueryKey {
        QueryKey::new("getRelatedProductsById").with(&id)
    }

    #[must_use]
    pub fn get_related_products_by_slug(slug: Option<&str>) -> QueryKey {
        QueryKey::new("getRelatedProductsBySlug").with(&slug)
    }
}

pub struct ProductManager<R> {
    repo: R,
    queries: QueryClient,
    store: Arc<ProductStore>,
    page_limit: u32,
}

impl<R: ProductRepository> ProductManager<R> {
    #[must_use]
    pub const fn new(
        repo: R,
        queries: QueryClient,
        store: Arc<ProductStore>,
        page_limit: u32,
    ) -> Self {
        Self {
            repo,
            queries,
            store,
            page_limit,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<ProductStore> {
        &self.store
    }

    /// First page of the product list, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_all_products(
        &self,
        filters: Option<&ProductFilters>,
    ) -> Result<PageSnapshot<Product>> {
        let base = filters.cloned().unwrap_or_default();
        let limit = base.limit.unwrap_or(self.page_limit);
        let snapshot = self
            .queries
            .infinite_query(
                keys::get_all_products(filters),
                |page| {
                    let windowed = base.with_window(page_offset(page, limit), limit);
                    let repo = &self.repo;
                    async move { repo.all(&windowed).await }
                },
                |pages| next_page_param(pages, limit),
                |_| {},
            )
            .await?;
        report_sync(self.store.set_products(snapshot.items()));
        Ok(snapshot)
    }

    /// Append the next page of the product list.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn fetch_more_products(
        &self,
        filters: Option<&ProductFilters>,
    ) -> Result<PageSnapshot<Product>> {
        let base = filters.cloned().unwrap_or_default();
        let limit = base.limit.unwrap_or(self.page_limit);
        let snapshot = self
            .queries
            .fetch_next_page(
                keys::get_all_products(filters),
                |page| {
                    let windowed = base.with_window(page_offset(page, limit), limit);
                    let repo = &self.repo;
                    async move { repo.all(&windowed).await }
                },
                |pages| next_page_param(pages, limit),
                |_| {},
            )
            .await?;
        report_sync(self.store.set_products(snapshot.items()));
        Ok(snapshot)
    }

    /// One product by id or slug.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_product(&self, key: impl Into<IdOrSlug>) -> Result<Arc<Product>> {
        match key.into() {
            IdOrSlug::Id(id) => self.get_product_by_id(ProductId::new(id)).await,
            IdOrSlug::Slug(slug) => self.get_product_by_slug(&slug).await,
        }
    }

    /// Products related to the given product, by id or slug.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_related_products(
        &self,
        key: impl Into<IdOrSlug>,
    ) -> Result<Arc<Vec<Product>>> {
        match key.into() {
            IdOrSlug::Id(id) => self.get_related_products_by_id(ProductId::new(id)).await,
            IdOrSlug::Slug(slug) => self.get_related_products_by_slug(&slug).await,
        }
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_product_by_id(&self, id: ProductId) -> Result<Arc<Product>> {
        let store = Arc::clone(&self.store);
        self.queries
            .query(
                keys::get_product_by_id(Some(id)),
                || self.repo.by_id(id),
                move |product| store.set_product(product),
            )
            .await
    }

    /// One product by slug.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Arc<Product>> {
        let store = Arc::clone(&self.store);
        self.queries
            .query(
                keys::get_product_by_slug(Some(slug)),
                || self.repo.by_slug(slug),
                move |product| store.set_product(product),
            )
            .await
    }

    /// Products related to the one with the given id.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_related_products_by_id(&self, id: ProductId) -> Result<Arc<Vec<Product>>> {
        let store = Arc::clone(&self.store);
        self.queries
            .query(
                keys::get_related_products_by_id(Some(id)),
                || self.repo.related_by_id(id),
                move |products: &Vec<Product>| {
                    store.set_related_products(IdOrSlug::from(id), products.clone());
                },
            )
            .await
    }

    /// Products related to the one with the given slug.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_related_products_by_slug(&self, slug: &str) -> Result<Arc<Vec<Product>>> {
        let store = Arc::clone(&self.store);
        let key = IdOrSlug::from(slug);
        self.queries
            .query(
                keys::get_related_products_by_slug(Some(slug)),
                || self.repo.related_by_slug(slug),
                move |products: &Vec<Product>| {
                    store.set_related_products(key.clone(), products.clone());
                },
            )
            .await
    }

    /// Create a product.
    ///
    /// Not retried: a replayed create could insert twice.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the remote create fails.
    pub async fn create_product(&self, payload: NewProduct) -> Result<MutationOutcome<Product>> {
        let invalidate = [
            keys::get_all_products(None),
            keys::get_related_products_by_slug(None),
        ];
        let store = Arc::clone(&self.store);
        self.queries
            .mutation(
                MutationKind::NonIdempotent,
                payload,
                |p| async move { self.repo.create(&p).await },
                move |product, _| store.create_product(product),
                &invalidate,
                |product, _| info!(id = %product.id, "product created"),
            )
            .await
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the remote update fails.
    pub async fn update_product(
        &self,
        id: ProductId,
        payload: ProductUpdate,
    ) -> Result<MutationOutcome<Product>> {
        let invalidate = [
            keys::get_all_products(None),
            keys::get_product_by_id(Some(id)),
            keys::get_related_products_by_id(Some(id)),
            keys::get_related_products_by_slug(None),
        ];
        let store = Arc::clone(&self.store);
        self.queries
            .mutation(
                MutationKind::Idempotent,
                payload,
                |p| async move { self.repo.update(id, &p).await },
                move |product, _| store.update_product(product),
                &invalidate,
                |product, _| info!(id = %product.id, "product updated"),
            )
            .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the remote delete fails.
    pub async fn delete_product(&self, id: ProductId) -> Result<MutationOutcome<bool>> {
        let invalidate = [
            keys::get_all_products(None),
            keys::get_product_by_id(Some(id)),
            keys::get_related_products_by_id(Some(id)),
            keys::get_related_products_by_slug(None),
        ];
        let store = Arc::clone(&self.store);
        self.queries
            .mutation(
                MutationKind::Idempotent,
                id,
                |id| async move { self.repo.delete(id).await },
                move |_, _| store.delete_product(id),
                &invalidate,
                |_, _| info!(id = %id, "product deleted"),
            )
            .await
    }
}
