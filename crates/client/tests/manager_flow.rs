//! End-to-end manager flows against in-memory repositories.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use fairmarket_client::error::{ErrorHandlerRegistry, ErrorKind, RawFailure, Result};
use fairmarket_client::manager::{AuthManager, CategoryManager, ProductManager};
use fairmarket_client::query::{QueryClient, QueryOptions};
use fairmarket_client::repository::{AuthRepository, CategoryRepository, ProductRepository};
use fairmarket_client::store::{AuthStore, CategoryStore, MemoryStorage, ProductStore};
use fairmarket_core::types::auth::{Credentials, LoginTokens, Profile, RefreshToken};
use fairmarket_core::types::category::{Category, CategoryUpdate, NewCategory};
use fairmarket_core::types::filter::{PaginationFilter, ProductFilters};
use fairmarket_core::types::id::{CategoryId, IdOrSlug, ProductId, ProfileId};
use fairmarket_core::types::product::{NewProduct, Product, ProductCategory, ProductUpdate};
use secrecy::{ExposeSecret, SecretString};

const PAGE_LIMIT: u32 = 10;

fn query_client() -> QueryClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    QueryClient::new(QueryOptions {
        stale_time: Duration::from_secs(300),
        retry: 0,
        retry_base_delay: Duration::from_millis(1),
    })
}

fn classified(status: u16) -> fairmarket_client::ApiError {
    ErrorHandlerRegistry::with_defaults().classify(&RawFailure::from_status(status, None))
}

fn product(id: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        slug: format!("product-{id}"),
        price: f64::from(i32::try_from(id).unwrap_or_default()),
        description: String::new(),
        category: ProductCategory {
            name: "Shoes".to_string(),
            image: String::new(),
        },
        images: vec![],
    }
}

fn category(id: i64) -> Category {
    Category {
        id: CategoryId::new(id),
        name: format!("Category {id}"),
        slug: format!("category-{id}"),
        image: String::new(),
    }
}

// =============================================================================
// Fake repositories
// =============================================================================

#[derive(Clone)]
struct FakeProductRepo {
    catalog: Arc<Vec<Product>>,
    list_calls: Arc<AtomicU32>,
}

impl FakeProductRepo {
    fn with_catalog(count: i64) -> Self {
        Self {
            catalog: Arc::new((1..=count).map(product).collect()),
            list_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl ProductRepository for FakeProductRepo {
    async fn all(&self, filters: &ProductFilters) -> Result<Vec<Product>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let offset = filters.offset.unwrap_or(0) as usize;
        let limit = filters.limit.unwrap_or(PAGE_LIMIT) as usize;
        Ok(self
            .catalog
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn by_id(&self, id: ProductId) -> Result<Product> {
        self.catalog
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| classified(404))
    }

    async fn by_slug(&self, slug: &str) -> Result<Product> {
        self.catalog
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| classified(404))
    }

    async fn related_by_id(&self, id: ProductId) -> Result<Vec<Product>> {
        Ok(self
            .catalog
            .iter()
            .filter(|p| p.id != id)
            .take(4)
            .cloned()
            .collect())
    }

    async fn related_by_slug(&self, slug: &str) -> Result<Vec<Product>> {
        Ok(self
            .catalog
            .iter()
            .filter(|p| p.slug != slug)
            .take(4)
            .cloned()
            .collect())
    }

    async fn create(&self, payload: &NewProduct) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(900),
            title: payload.title.clone(),
            slug: payload.title.to_lowercase().replace(' ', "-"),
            price: payload.price,
            description: payload.description.clone(),
            category: ProductCategory {
                name: "Shoes".to_string(),
                image: String::new(),
            },
            images: payload.images.clone(),
        })
    }

    async fn update(&self, id: ProductId, payload: &ProductUpdate) -> Result<Product> {
        let mut current = self.by_id(id).await?;
        if let Some(title) = &payload.title {
            current.title = title.clone();
        }
        if let Some(price) = payload.price {
            current.price = price;
        }
        Ok(current)
    }

    async fn delete(&self, _id: ProductId) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Clone)]
struct FakeCategoryRepo {
    categories: Arc<Vec<Category>>,
    products: Arc<Vec<Product>>,
    product_calls: Arc<AtomicU32>,
}

impl FakeCategoryRepo {
    fn new(category_count: i64, products_per_category: i64) -> Self {
        Self {
            categories: Arc::new((1..=category_count).map(category).collect()),
            products: Arc::new((1..=products_per_category).map(product).collect()),
            product_calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl CategoryRepository for FakeCategoryRepo {
    async fn all(&self, filter: &PaginationFilter) -> Result<Vec<Category>> {
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.unwrap_or(PAGE_LIMIT) as usize;
        Ok(self
            .categories
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn by_id(&self, id: CategoryId) -> Result<Category> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| classified(404))
    }

    async fn by_slug(&self, slug: &str) -> Result<Category> {
        self.categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned()
            .ok_or_else(|| classified(404))
    }

    async fn products(&self, _id: CategoryId, filter: &PaginationFilter) -> Result<Vec<Product>> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.unwrap_or(PAGE_LIMIT) as usize;
        Ok(self
            .products
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create(&self, payload: &NewCategory) -> Result<Category> {
        Ok(Category {
            id: CategoryId::new(500),
            name: payload.name.clone(),
            slug: payload.name.to_lowercase(),
            image: payload.image.clone(),
        })
    }

    async fn update(&self, id: CategoryId, payload: &CategoryUpdate) -> Result<Category> {
        let mut current = self.by_id(id).await?;
        if let Some(name) = &payload.name {
            current.name = name.clone();
        }
        Ok(current)
    }

    async fn delete(&self, _id: CategoryId) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Clone)]
struct FakeAuthRepo {
    profile_calls: Arc<AtomicU32>,
}

impl FakeAuthRepo {
    fn new() -> Self {
        Self {
            profile_calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl AuthRepository for FakeAuthRepo {
    async fn login(&self, credentials: &Credentials) -> Result<LoginTokens> {
        if credentials.email == "user@example.com" {
            Ok(LoginTokens {
                access_token: SecretString::from("access-1"),
                refresh_token: SecretString::from("refresh-1"),
            })
        } else {
            Err(classified(401))
        }
    }

    async fn refresh(&self, token: &RefreshToken) -> Result<LoginTokens> {
        if token.refresh_token.expose_secret() == "refresh-1" {
            Ok(LoginTokens {
                access_token: SecretString::from("access-2"),
                refresh_token: SecretString::from("refresh-2"),
            })
        } else {
            Err(classified(401))
        }
    }

    async fn profile(&self) -> Result<Profile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Profile {
            id: ProfileId::new(1),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            role: "customer".to_string(),
            avatar: String::new(),
        })
    }
}

fn product_manager(repo: FakeProductRepo) -> ProductManager<FakeProductRepo> {
    ProductManager::new(
        repo,
        query_client(),
        Arc::new(ProductStore::new(Arc::new(MemoryStorage::new()))),
        PAGE_LIMIT,
    )
}

fn category_manager(repo: FakeCategoryRepo) -> CategoryManager<FakeCategoryRepo> {
    CategoryManager::new(
        repo,
        query_client(),
        Arc::new(CategoryStore::new(Arc::new(MemoryStorage::new()))),
        PAGE_LIMIT,
    )
}

fn auth_manager(repo: FakeAuthRepo) -> AuthManager<FakeAuthRepo> {
    let config = fairmarket_client::config::AppConfig::with_base_url(
        "http://localhost:9/".parse().expect("url"),
    );
    let api = fairmarket_client::http::ApiClient::new(
        &config,
        Arc::new(ErrorHandlerRegistry::with_defaults()),
    )
    .expect("client");
    AuthManager::new(
        repo,
        query_client(),
        Arc::new(AuthStore::new(Arc::new(MemoryStorage::new()))),
        api,
    )
}

// =============================================================================
// Product flows
// =============================================================================

#[tokio::test]
async fn test_product_pagination_walks_full_short_then_stops() {
    let repo = FakeProductRepo::with_catalog(27);
    let manager = product_manager(repo.clone());

    let first = manager.get_all_products(None).await.expect("first page");
    assert_eq!(first.items().len(), 10);
    assert!(first.has_next_page());

    let second = manager.fetch_more_products(None).await.expect("second page");
    assert_eq!(second.items().len(), 20);
    assert!(second.has_next_page());

    let third = manager.fetch_more_products(None).await.expect("third page");
    assert_eq!(third.items().len(), 27);
    assert!(!third.has_next_page());
    assert_eq!(repo.list_calls(), 3);

    // Exhausted: no further fetches happen.
    let again = manager.fetch_more_products(None).await.expect("no-op");
    assert_eq!(again.items().len(), 27);
    assert_eq!(repo.list_calls(), 3);

    assert_eq!(manager.store().products().len(), 27);
}

#[tokio::test]
async fn test_pagination_stops_on_empty_page() {
    // Exactly one full page: the boundary page is full, so the next
    // cursor exists and the follow-up fetch comes back empty.
    let repo = FakeProductRepo::with_catalog(10);
    let manager = product_manager(repo.clone());

    let first = manager.get_all_products(None).await.expect("first page");
    assert!(first.has_next_page());

    let second = manager.fetch_more_products(None).await.expect("empty page");
    assert_eq!(second.items().len(), 10);
    assert!(!second.has_next_page());
    assert_eq!(repo.list_calls(), 2);
}

#[tokio::test]
async fn test_filter_limit_drives_page_window() {
    let repo = FakeProductRepo::with_catalog(7);
    let manager = product_manager(repo.clone());

    let filters = ProductFilters {
        limit: Some(3),
        ..ProductFilters::default()
    };
    let first = manager
        .get_all_products(Some(&filters))
        .await
        .expect("first page");
    assert_eq!(first.items().len(), 3);
    assert!(first.has_next_page());

    let second = manager
        .fetch_more_products(Some(&filters))
        .await
        .expect("second page");
    assert_eq!(second.items().len(), 6);
    assert!(second.has_next_page());

    let third = manager
        .fetch_more_products(Some(&filters))
        .await
        .expect("third page");
    assert_eq!(third.items().len(), 7);
    assert!(!third.has_next_page());
    assert_eq!(repo.list_calls(), 3);
}

#[tokio::test]
async fn test_fresh_list_served_from_cache() {
    let repo = FakeProductRepo::with_catalog(5);
    let manager = product_manager(repo.clone());

    manager.get_all_products(None).await.expect("first call");
    manager.get_all_products(None).await.expect("second call");
    assert_eq!(repo.list_calls(), 1);
}

#[tokio::test]
async fn test_filtered_and_unfiltered_lists_cache_separately() {
    let repo = FakeProductRepo::with_catalog(5);
    let manager = product_manager(repo.clone());

    let filters = ProductFilters {
        title: Some("Product 1".to_string()),
        ..ProductFilters::default()
    };
    manager.get_all_products(None).await.expect("unfiltered");
    manager
        .get_all_products(Some(&filters))
        .await
        .expect("filtered");
    assert_eq!(repo.list_calls(), 2);

    // The default filter collapses onto the unfiltered key.
    manager
        .get_all_products(Some(&ProductFilters::default()))
        .await
        .expect("default filter");
    assert_eq!(repo.list_calls(), 2);
}

#[tokio::test]
async fn test_create_product_invalidates_lists() {
    let repo = FakeProductRepo::with_catalog(5);
    let manager = product_manager(repo.clone());

    manager.get_all_products(None).await.expect("seed cache");
    assert_eq!(repo.list_calls(), 1);

    let outcome = manager
        .create_product(NewProduct {
            title: "Brand New".to_string(),
            price: 12.0,
            description: String::new(),
            category_id: CategoryId::new(1),
            images: vec![],
        })
        .await
        .expect("create");
    assert_eq!(outcome.data.id, ProductId::new(900));
    assert!(outcome.write_error.is_none());

    // The invalidated list refetches on next read.
    manager.get_all_products(None).await.expect("refetch");
    assert_eq!(repo.list_calls(), 2);
}

#[tokio::test]
async fn test_update_product_invalidates_detail() {
    let repo = FakeProductRepo::with_catalog(5);
    let manager = product_manager(repo.clone());
    let id = ProductId::new(3);

    manager.get_product_by_id(id).await.expect("seed detail");

    let outcome = manager
        .update_product(
            id,
            ProductUpdate {
                title: Some("Renamed".to_string()),
                ..ProductUpdate::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(outcome.data.title, "Renamed");

    // Detail was invalidated; the refetch comes from the repo (which
    // still serves the original title).
    let detail = manager.get_product_by_id(id).await.expect("refetch");
    assert_eq!(detail.title, "Product 3");
}

#[tokio::test]
async fn test_missing_product_classifies_not_found() {
    let repo = FakeProductRepo::with_catalog(2);
    let manager = product_manager(repo);

    let err = manager
        .get_product_by_id(ProductId::new(99))
        .await
        .expect_err("missing product");
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, "Resource not found.");
    assert_eq!(err.status_code, Some(404));
}

#[tokio::test]
async fn test_detail_lookup_by_id_or_slug() {
    let repo = FakeProductRepo::with_catalog(3);
    let manager = product_manager(repo);

    let by_id = manager.get_product(ProductId::new(2)).await.expect("by id");
    assert_eq!(by_id.slug, "product-2");

    let by_slug = manager.get_product("product-2").await.expect("by slug");
    assert_eq!(by_slug.id, ProductId::new(2));

    // Different key shapes fetch independently but agree on content.
    assert_eq!(by_id.title, by_slug.title);
    // The store indexes the detail under both lookup forms.
    assert_eq!(
        manager
            .store()
            .product_for(&IdOrSlug::from(ProductId::new(2)))
            .expect("by id key")
            .id,
        by_slug.id
    );
    assert_eq!(
        manager
            .store()
            .product_for(&IdOrSlug::from("product-2"))
            .expect("by slug key")
            .id,
        by_slug.id
    );
}

// =============================================================================
// Category flows
// =============================================================================

#[tokio::test]
async fn test_category_list_and_products_by_category() {
    let repo = FakeCategoryRepo::new(3, 14);
    let manager = category_manager(repo.clone());

    let categories = manager.get_all_categories(None).await.expect("categories");
    assert_eq!(categories.items().len(), 3);
    assert!(!categories.has_next_page());
    assert_eq!(manager.store().categories().len(), 3);

    let id = CategoryId::new(1);
    let first = manager
        .get_products_by_category(id, None)
        .await
        .expect("first page");
    assert_eq!(first.items().len(), 10);
    assert!(first.has_next_page());

    let second = manager
        .fetch_more_products_by_category(id, None)
        .await
        .expect("second page");
    assert_eq!(second.items().len(), 14);
    assert!(!second.has_next_page());
    assert_eq!(
        manager.store().products_for(id).map(|p| p.len()),
        Some(14)
    );
}

#[tokio::test]
async fn test_products_by_category_honors_filter_limit() {
    let repo = FakeCategoryRepo::new(1, 5);
    let manager = category_manager(repo.clone());
    let id = CategoryId::new(1);

    let filter = PaginationFilter {
        limit: Some(2),
        ..PaginationFilter::default()
    };
    let first = manager
        .get_products_by_category(id, Some(&filter))
        .await
        .expect("windowed page");
    assert_eq!(first.items().len(), 2);
    assert!(first.has_next_page());

    // A different filter is a different key and fetches independently.
    let unfiltered = manager
        .get_products_by_category(id, None)
        .await
        .expect("full page");
    assert_eq!(unfiltered.items().len(), 5);
    assert_eq!(repo.product_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_delete_category_invalidates_its_product_list() {
    let repo = FakeCategoryRepo::new(2, 4);
    let manager = category_manager(repo.clone());
    let id = CategoryId::new(1);

    manager.get_products_by_category(id, None).await.expect("seed");
    assert_eq!(repo.product_calls.load(Ordering::SeqCst), 1);

    manager.delete_category(id).await.expect("delete");
    assert!(manager.store().products_for(id).is_none());

    manager
        .get_products_by_category(id, None)
        .await
        .expect("refetch");
    assert_eq!(repo.product_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_create_category_upserts_into_store() {
    let repo = FakeCategoryRepo::new(1, 0);
    let manager = category_manager(repo);

    let outcome = manager
        .create_category(NewCategory {
            name: "Hats".to_string(),
            image: String::new(),
        })
        .await
        .expect("create");
    assert!(outcome.write_error.is_none());

    // A second create with the same id replaces rather than conflicts.
    let outcome = manager
        .create_category(NewCategory {
            name: "Caps".to_string(),
            image: String::new(),
        })
        .await
        .expect("second create");
    assert!(outcome.write_error.is_none());

    let names: Vec<String> = manager
        .store()
        .categories()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Caps".to_string()]);
}

// =============================================================================
// Session flows
// =============================================================================

#[tokio::test]
async fn test_login_fetches_profile_and_caches_it() {
    let repo = FakeAuthRepo::new();
    let manager = auth_manager(repo.clone());

    let profile = manager
        .login(Credentials::new("user@example.com", "secret"))
        .await
        .expect("login");
    assert_eq!(profile.email, "user@example.com");
    assert!(manager.is_authenticated());
    assert_eq!(manager.store().profile().expect("profile").name, "Test User");

    // Cached: no second remote profile fetch.
    manager.get_profile().await.expect("cached profile");
    assert_eq!(repo.profile_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_login_failure_classifies_unauthorized() {
    let repo = FakeAuthRepo::new();
    let manager = auth_manager(repo);

    let err = manager
        .login(Credentials::new("wrong@example.com", "secret"))
        .await
        .expect_err("bad credentials");
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_refresh_rotates_tokens_and_invalidates_profile() {
    let repo = FakeAuthRepo::new();
    let manager = auth_manager(repo.clone());

    manager
        .login(Credentials::new("user@example.com", "secret"))
        .await
        .expect("login");
    assert_eq!(repo.profile_calls.load(Ordering::SeqCst), 1);

    manager.refresh_token().await.expect("refresh");
    assert_eq!(
        manager
            .store()
            .access_token()
            .expect("token")
            .expose_secret(),
        "access-2"
    );

    // The profile key was invalidated by the refresh.
    manager.get_profile().await.expect("refetch profile");
    assert_eq!(repo.profile_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_without_session_is_unauthorized() {
    let manager = auth_manager(FakeAuthRepo::new());

    let err = manager.refresh_token().await.expect_err("no session");
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "No refresh token available.");
}

#[tokio::test]
async fn test_logout_clears_session_and_cache() {
    let repo = FakeAuthRepo::new();
    let manager = auth_manager(repo.clone());

    manager
        .login(Credentials::new("user@example.com", "secret"))
        .await
        .expect("login");
    manager.logout().await.expect("logout");

    assert!(!manager.is_authenticated());
    assert!(manager.store().profile().is_none());

    // Cache was dropped with the session.
    manager.get_profile().await.expect("fresh fetch");
    assert_eq!(repo.profile_calls.load(Ordering::SeqCst), 2);
}
