//! Product store.
//!
//! Holds the product list plus per-lookup detail and related-products
//! maps. Detail entries are indexed under both the id and the slug so
//! either lookup form finds them. Only the list and its timestamp
//! persist; the maps are derived per screen and rebuilt from fetches.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use fairmarket_core::types::id::{IdOrSlug, ProductId};
use fairmarket_core::types::product::Product;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StoreError;
use super::persist::StorageProvider;

const STORE_NAME: &str = "product-store";

#[derive(Debug, Default)]
struct ProductState {
    products: Vec<Product>,
    product_by_key: HashMap<IdOrSlug, Product>,
    related_by_key: HashMap<IdOrSlug, Vec<Product>>,
    last_updated: Option<DateTime<Utc>>,
}

/// The persisted slice of [`ProductState`].
#[derive(Debug, Serialize, Deserialize)]
struct ProductSnapshot {
    products: Vec<Product>,
    last_updated: Option<DateTime<Utc>>,
}

pub struct ProductStore {
    state: RwLock<ProductState>,
    storage: Arc<dyn StorageProvider>,
}

impl ProductStore {
    /// Create the store, rehydrating the persisted snapshot if one
    /// exists. A corrupt or unreadable snapshot logs a warning and
    /// starts the store empty.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        let mut state = ProductState::default();
        match storage.get(STORE_NAME) {
            Ok(Some(raw)) => match serde_json::from_str::<ProductSnapshot>(&raw) {
                Ok(snapshot) => {
                    state.products = snapshot.products;
                    state.last_updated = snapshot.last_updated;
                }
                Err(e) => warn!(store = STORE_NAME, error = %e, "discarding corrupt snapshot"),
            },
            Ok(None) => {}
            Err(e) => warn!(store = STORE_NAME, error = %e, "failed to read snapshot"),
        }
        Self {
            state: RwLock::new(state),
            storage,
        }
    }

    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.read().products.clone()
    }

    #[must_use]
    pub fn product_for(&self, key: &IdOrSlug) -> Option<Product> {
        self.read().product_by_key.get(key).cloned()
    }

    #[must_use]
    pub fn related_products_for(&self, key: &IdOrSlug) -> Option<Vec<Product>> {
        self.read().related_by_key.get(key).cloned()
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().last_updated
    }

    /// Replace the product list.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn set_products(&self, products: Vec<Product>) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            state.products = products;
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// Cache a fetched product detail under both its id and its slug.
    /// Not persisted.
    pub fn set_product(&self, product: &Product) {
        let mut state = self.write();
        state
            .product_by_key
            .insert(IdOrSlug::from(product.id), product.clone());
        state
            .product_by_key
            .insert(IdOrSlug::from(product.slug.clone()), product.clone());
    }

    /// Cache the related-products list for one lookup key. Not persisted.
    pub fn set_related_products(&self, key: IdOrSlug, products: Vec<Product>) {
        self.write().related_by_key.insert(key, products);
    }

    /// Add a newly created product to the list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a product with the same id
    /// is already present, or a persistence error.
    pub fn create_product(&self, product: &Product) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            if state.products.iter().any(|p| p.id == product.id) {
                return Err(StoreError::Conflict {
                    id: product.id.as_i64(),
                });
            }
            state.products.push(product.clone());
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// Replace an existing product in place; a miss is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let changed = {
            let mut state = self.write();
            let slot = state.products.iter_mut().find(|p| p.id == product.id);
            match slot {
                Some(slot) => {
                    *slot = product.clone();
                    state
                        .product_by_key
                        .insert(IdOrSlug::from(product.id), product.clone());
                    state
                        .product_by_key
                        .insert(IdOrSlug::from(product.slug.clone()), product.clone());
                    state.last_updated = Some(Utc::now());
                    true
                }
                None => false,
            }
        };
        if changed { self.persist() } else { Ok(()) }
    }

    /// Remove a product and any derived state referencing it.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            let slug = state
                .products
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.slug.clone());
            state.products.retain(|p| p.id != id);
            state.product_by_key.remove(&IdOrSlug::from(id));
            state.related_by_key.remove(&IdOrSlug::from(id));
            if let Some(slug) = slug {
                state.product_by_key.remove(&IdOrSlug::from(slug.clone()));
                state.related_by_key.remove(&IdOrSlug::from(slug));
            }
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// Drop everything, persisted snapshot included.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        *self.write() = ProductState::default();
        self.storage.remove(STORE_NAME)?;
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = {
            let state = self.read();
            ProductSnapshot {
                products: state.products.clone(),
                last_updated: state.last_updated,
            }
        };
        let raw = serde_json::to_string(&snapshot)?;
        self.storage.set(STORE_NAME, &raw)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ProductState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ProductState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::super::persist::MemoryStorage;
    use super::*;
    use fairmarket_core::types::product::ProductCategory;

    fn product(id: i64, title: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            price: 10.0,
            description: String::new(),
            category: ProductCategory {
                name: "Shoes".to_string(),
                image: String::new(),
            },
            images: vec![],
        }
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let store = ProductStore::new(Arc::new(MemoryStorage::new()));
        store.create_product(&product(1, "First")).unwrap();

        let err = store.create_product(&product(1, "Again")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { id: 1 }));
        assert_eq!(store.products().len(), 1);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let store = ProductStore::new(Arc::new(MemoryStorage::new()));
        store.update_product(&product(9, "Ghost")).unwrap();
        assert!(store.products().is_empty());
    }

    #[test]
    fn test_detail_indexed_under_both_id_and_slug() {
        let store = ProductStore::new(Arc::new(MemoryStorage::new()));
        let p = product(1, "First");
        store.set_product(&p);

        assert_eq!(store.product_for(&IdOrSlug::from(p.id)), Some(p.clone()));
        assert_eq!(store.product_for(&IdOrSlug::from("first")), Some(p));
    }

    #[test]
    fn test_delete_drops_derived_state() {
        let store = ProductStore::new(Arc::new(MemoryStorage::new()));
        let p = product(1, "First");
        store.set_products(vec![p.clone(), product(2, "Second")]).unwrap();
        store.set_product(&p);
        store.set_related_products(IdOrSlug::from(p.id), vec![]);

        store.delete_product(ProductId::new(1)).unwrap();

        assert_eq!(store.products().len(), 1);
        assert!(store.product_for(&IdOrSlug::from(p.id)).is_none());
        assert!(store.product_for(&IdOrSlug::from("first")).is_none());
        assert!(store.related_products_for(&IdOrSlug::from(p.id)).is_none());
    }

    #[test]
    fn test_snapshot_persists_list_only() {
        let storage = Arc::new(MemoryStorage::new());
        let store = ProductStore::new(Arc::clone(&storage) as Arc<dyn StorageProvider>);
        store.set_products(vec![product(1, "First")]).unwrap();
        store.set_product(&product(2, "Viewed"));

        let rehydrated = ProductStore::new(storage);
        assert_eq!(rehydrated.products().len(), 1);
        assert!(rehydrated.product_for(&IdOrSlug::from("viewed")).is_none());
        assert!(rehydrated.last_updated().is_some());
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(STORE_NAME, "not json").unwrap();

        let store = ProductStore::new(storage);
        assert!(store.products().is_empty());
    }
}
