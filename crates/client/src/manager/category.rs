//! Category operations.

use std::sync::Arc;

use fairmarket_core::types::category::{Category, CategoryUpdate, NewCategory};
use fairmarket_core::types::filter::PaginationFilter;
use fairmarket_core::types::id::{CategoryId, IdOrSlug};
use fairmarket_core::types::product::Product;
use tracing::info;

use super::report_sync;
use crate::error::Result;
use crate::query::{
    MutationKind, MutationOutcome, PageSnapshot, QueryClient, next_page_param, page_offset,
};
use crate::repository::CategoryRepository;
use crate::store::CategoryStore;

/// Cache keys for category reads.
pub mod keys {
    use super::{CategoryId, PaginationFilter};
    use crate::query::QueryKey;

    #[must_use]
    pub fn get_all_categories(filter: Option<&PaginationFilter>) -> QueryKey {
        QueryKey::new("getAllCategories").with(&filter)
    }

    #[must_use]
    pub fn get_category_by_id(id: Option<CategoryId>) -> QueryKey {
        QueryKey::new("getCategoryById").with(&id)
    }

    #[must_use]
    pub fn get_category_by_slug(slug: Option<&str>) -> QueryKey {
        QueryKey::new("getCategoryBySlug").with(&slug)
    }

    #[must_use]
    pub fn get_all_products_by_category(
        id: Option<CategoryId>,
        filter: Option<&PaginationFilter>,
    ) -> QueryKey {
        QueryKey::new("getAllProductsByCategory").with(&id).with(&filter)
    }
}

pub struct CategoryManager<R> {
    repo: R,
    queries: QueryClient,
    store: Arc<CategoryStore>,
    page_limit: u32,
}

impl<R: CategoryRepository> CategoryManager<R> {
    #[must_use]
    pub const fn new(
        repo: R,
        queries: QueryClient,
        store: Arc<CategoryStore>,
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
    pub const fn store(&self) -> &Arc<CategoryStore> {
        &self.store
    }

    /// First page of the category list, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_all_categories(
        &self,
        filter: Option<&PaginationFilter>,
    ) -> Result<PageSnapshot<Category>> {
        let base = filter.copied().unwrap_or_default();
        let limit = base.limit.unwrap_or(self.page_limit);
        let snapshot = self
            .queries
            .infinite_query(
                keys::get_all_categories(filter),
                |page| {
                    let windowed = base.with_window(page_offset(page, limit), limit);
                    let repo = &self.repo;
                    async move { repo.all(&windowed).await }
                },
                |pages| next_page_param(pages, limit),
                |_| {},
            )
            .await?;
        report_sync(self.store.set_categories(snapshot.items()));
        Ok(snapshot)
    }

    /// Append the next page of the category list.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn fetch_more_categories(
        &self,
        filter: Option<&PaginationFilter>,
    ) -> Result<PageSnapshot<Category>> {
        let base = filter.copied().unwrap_or_default();
        let limit = base.limit.unwrap_or(self.page_limit);
        let snapshot = self
            .queries
            .fetch_next_page(
                keys::get_all_categories(filter),
                |page| {
                    let windowed = base.with_window(page_offset(page, limit), limit);
                    let repo = &self.repo;
                    async move { repo.all(&windowed).await }
                },
                |pages| next_page_param(pages, limit),
                |_| {},
            )
            .await?;
        report_sync(self.store.set_categories(snapshot.items()));
        Ok(snapshot)
    }

    /// One category by id or slug.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_category(&self, key: impl Into<IdOrSlug>) -> Result<Arc<Category>> {
        match key.into() {
            IdOrSlug::Id(id) => self.get_category_by_id(CategoryId::new(id)).await,
            IdOrSlug::Slug(slug) => self.get_category_by_slug(&slug).await,
        }
    }

    /// One category by id.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_category_by_id(&self, id: CategoryId) -> Result<Arc<Category>> {
        let store = Arc::clone(&self.store);
        self.queries
            .query(
                keys::get_category_by_id(Some(id)),
                || self.repo.by_id(id),
                move |category| store.set_category(category),
            )
            .await
    }

    /// One category by slug.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Arc<Category>> {
        let store = Arc::clone(&self.store);
        self.queries
            .query(
                keys::get_category_by_slug(Some(slug)),
                || self.repo.by_slug(slug),
                move |category| store.set_category(category),
            )
            .await
    }

    /// Paginated products within one category.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn get_products_by_category(
        &self,
        id: CategoryId,
        filter: Option<&PaginationFilter>,
    ) -> Result<PageSnapshot<Product>> {
        let base = filter.copied().unwrap_or_default();
        let limit = base.limit.unwrap_or(self.page_limit);
        let snapshot = self
            .queries
            .infinite_query(
                keys::get_all_products_by_category(Some(id), filter),
                |page| {
                    let windowed = base.with_window(page_offset(page, limit), limit);
                    let repo = &self.repo;
                    async move { repo.products(id, &windowed).await }
                },
                |pages| next_page_param(pages, limit),
                |_| {},
            )
            .await?;
        self.store.set_products_for(id, snapshot.items());
        Ok(snapshot)
    }

    /// Append the next page of products within one category.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the fetch fails.
    pub async fn fetch_more_products_by_category(
        &self,
        id: CategoryId,
        filter: Option<&PaginationFilter>,
    ) -> Result<PageSnapshot<Product>> {
        let base = filter.copied().unwrap_or_default();
        let limit = base.limit.unwrap_or(self.page_limit);
        let snapshot = self
            .queries
            .fetch_next_page(
                keys::get_all_products_by_category(Some(id), filter),
                |page| {
                    let windowed = base.with_window(page_offset(page, limit), limit);
                    let repo = &self.repo;
                    async move { repo.products(id, &windowed).await }
                },
                |pages| next_page_param(pages, limit),
                |_| {},
            )
            .await?;
        self.store.set_products_for(id, snapshot.items());
        Ok(snapshot)
    }

    /// Create a category.
    ///
    /// Not retried: a replayed create could insert twice. The created
    /// id is only known afterwards, so every per-category product list
    /// is invalidated rather than one.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the remote create fails.
    pub async fn create_category(&self, payload: NewCategory) -> Result<MutationOutcome<Category>> {
        let invalidate = [
            keys::get_all_categories(None),
            keys::get_all_products_by_category(None, None),
        ];
        let store = Arc::clone(&self.store);
        self.queries
            .mutation(
                MutationKind::NonIdempotent,
                payload,
                |p| async move { self.repo.create(&p).await },
                move |category, _| store.create_category(category),
                &invalidate,
                |category, _| info!(id = %category.id, "category created"),
            )
            .await
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the remote update fails.
    pub async fn update_category(
        &self,
        id: CategoryId,
        payload: CategoryUpdate,
    ) -> Result<MutationOutcome<Category>> {
        let invalidate = [
            keys::get_all_categories(None),
            keys::get_category_by_id(Some(id)),
            keys::get_all_products_by_category(Some(id), None),
        ];
        let store = Arc::clone(&self.store);
        self.queries
            .mutation(
                MutationKind::Idempotent,
                payload,
                |p| async move { self.repo.update(id, &p).await },
                move |category, _| store.update_category(category),
                &invalidate,
                |category, _| info!(id = %category.id, "category updated"),
            )
            .await
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the remote delete fails.
    pub async fn delete_category(&self, id: CategoryId) -> Result<MutationOutcome<bool>> {
        let invalidate = [
            keys::get_all_categories(None),
            keys::get_category_by_id(Some(id)),
            keys::get_all_products_by_category(Some(id), None),
        ];
        let store = Arc::clone(&self.store);
        self.queries
            .mutation(
                MutationKind::Idempotent,
                id,
                |id| async move { self.repo.delete(id).await },
                move |_, _| store.delete_category(id),
                &invalidate,
                |_, _| info!(id = %id, "category deleted"),
            )
            .await
    }
}
