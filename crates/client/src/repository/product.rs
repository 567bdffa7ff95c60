//! Product data access.

use fairmarket_core::dto::ProductDto;
use fairmarket_core::types::filter::ProductFilters;
use fairmarket_core::types::id::ProductId;
use fairmarket_core::types::product::{NewProduct, Product, ProductUpdate};

use crate::error::Result;
use crate::http::{ApiClient, endpoints};

/// Remote product operations.
pub trait ProductRepository: Send + Sync {
    fn all(&self, filters: &ProductFilters) -> impl Future<Output = Result<Vec<Product>>> + Send;
    fn by_id(&self, id: ProductId) -> impl Future<Output = Result<Product>> + Send;
    fn by_slug(&self, slug: &str) -> impl Future<Output = Result<Product>> + Send;
    fn related_by_id(&self, id: ProductId) -> impl Future<Output = Result<Vec<Product>>> + Send;
    fn related_by_slug(&self, slug: &str) -> impl Future<Output = Result<Vec<Product>>> + Send;
    fn create(&self, payload: &NewProduct) -> impl Future<Output = Result<Product>> + Send;
    fn update(
        &self,
        id: ProductId,
        payload: &ProductUpdate,
    ) -> impl Future<Output = Result<Product>> + Send;
    fn delete(&self, id: ProductId) -> impl Future<Output = Result<bool>> + Send;
}

/// [`ProductRepository`] over the remote JSON API.
#[derive(Clone)]
pub struct HttpProductRepository {
    api: ApiClient,
}

impl HttpProductRepository {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl ProductRepository for HttpProductRepository {
    async fn all(&self, filters: &ProductFilters) -> Result<Vec<Product>> {
        let dtos: Vec<ProductDto> = self.api.get(&endpoints::products(filters)).await?;
        Ok(dtos.into_iter().map(Product::from).collect())
    }

    async fn by_id(&self, id: ProductId) -> Result<Product> {
        let dto: ProductDto = self.api.get(&endpoints::product_by_id(id)).await?;
        Ok(dto.into())
    }

    async fn by_slug(&self, slug: &str) -> Result<Product> {
        let dto: ProductDto = self.api.get(&endpoints::product_by_slug(slug)).await?;
        Ok(dto.into())
    }

    async fn related_by_id(&self, id: ProductId) -> Result<Vec<Product>> {
        let dtos: Vec<ProductDto> = self.api.get(&endpoints::related_products_by_id(id)).await?;
        Ok(dtos.into_iter().map(Product::from).collect())
    }

    async fn related_by_slug(&self, slug: &str) -> Result<Vec<Product>> {
        let dtos: Vec<ProductDto> = self
            .api
            .get(&endpoints::related_products_by_slug(slug))
            .await?;
        Ok(dtos.into_iter().map(Product::from).collect())
    }

    async fn create(&self, payload: &NewProduct) -> Result<Product> {
        let dto: ProductDto = self.api.post(endpoints::create_product(), payload).await?;
        Ok(dto.into())
    }

    async fn update(&self, id: ProductId, payload: &ProductUpdate) -> Result<Product> {
        let dto: ProductDto = self.api.put(&endpoints::update_product(id), payload).await?;
        Ok(dto.into())
    }

    async fn delete(&self, id: ProductId) -> Result<bool> {
        self.api.delete(&endpoints::delete_product(id)).await
    }
}
