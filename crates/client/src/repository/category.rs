//! Category data access.

use fairmarket_core::dto::{CategoryDto, ProductDto};
use fairmarket_core::types::category::{Category, CategoryUpdate, NewCategory};
use fairmarket_core::types::filter::PaginationFilter;
use fairmarket_core::types::id::CategoryId;
use fairmarket_core::types::product::Product;

use crate::error::Result;
use crate::http::{ApiClient, endpoints};

/// Remote category operations.
pub trait CategoryRepository: Send + Sync {
    fn all(&self, filter: &PaginationFilter) -> impl Future<Output = Result<Vec<Category>>> + Send;
    fn by_id(&self, id: CategoryId) -> impl Future<Output = Result<Category>> + Send;
    fn by_slug(&self, slug: &str) -> impl Future<Output = Result<Category>> + Send;
    fn products(
        &self,
        id: CategoryId,
        filter: &PaginationFilter,
    ) -> impl Future<Output = Result<Vec<Product>>> + Send;
    fn create(&self, payload: &NewCategory) -> impl Future<Output = Result<Category>> + Send;
    fn update(
        &self,
        id: CategoryId,
        payload: &CategoryUpdate,
    ) -> impl Future<Output = Result<Category>> + Send;
    fn delete(&self, id: CategoryId) -> impl Future<Output = Result<bool>> + Send;
}

/// [`CategoryRepository`] over the remote JSON API.
#[derive(Clone)]
pub struct HttpCategoryRepository {
    api: ApiClient,
}

impl HttpCategoryRepository {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl CategoryRepository for HttpCategoryRepository {
    async fn all(&self, filter: &PaginationFilter) -> Result<Vec<Category>> {
        let dtos: Vec<CategoryDto> = self.api.get(&endpoints::categories(filter)).await?;
        Ok(dtos.into_iter().map(Category::from).collect())
    }

    async fn by_id(&self, id: CategoryId) -> Result<Category> {
        let dto: CategoryDto = self.api.get(&endpoints::category_by_id(id)).await?;
        Ok(dto.into())
    }

    async fn by_slug(&self, slug: &str) -> Result<Category> {
        let dto: CategoryDto = self.api.get(&endpoints::category_by_slug(slug)).await?;
        Ok(dto.into())
    }

    async fn products(&self, id: CategoryId, filter: &PaginationFilter) -> Result<Vec<Product>> {
        let dtos: Vec<ProductDto> = self
            .api
            .get(&endpoints::products_by_category(id, filter))
            .await?;
        Ok(dtos.into_iter().map(Product::from).collect())
    }

    async fn create(&self, payload: &NewCategory) -> Result<Category> {
        let dto: CategoryDto = self.api.post(endpoints::create_category(), payload).await?;
        Ok(dto.into())
    }

    async fn update(&self, id: CategoryId, payload: &CategoryUpdate) -> Result<Category> {
        let dto: CategoryDto = self.api.put(&endpoints::update_category(id), payload).await?;
        Ok(dto.into())
    }

    async fn delete(&self, id: CategoryId) -> Result<bool> {
        self.api.delete(&endpoints::delete_category(id)).await
    }
}
