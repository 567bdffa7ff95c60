//! Category store.
//!
//! Holds the category list, per-lookup category detail (indexed under
//! both id and slug), and the per-category product lists. Only the
//! category list and its timestamp persist.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use fairmarket_core::types::category::Category;
use fairmarket_core::types::id::{CategoryId, IdOrSlug};
use fairmarket_core::types::product::Product;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StoreError;
use super::persist::StorageProvider;

const STORE_NAME: &str = "category-store";

#[derive(Debug, Default)]
struct CategoryState {
    categories: Vec<Category>,
    category_by_key: HashMap<IdOrSlug, Category>,
    products_by_category: HashMap<i64, Vec<Product>>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CategorySnapshot {
    categories: Vec<Category>,
    last_updated: Option<DateTime<Utc>>,
}

pub struct CategoryStore {
    state: RwLock<CategoryState>,
    storage: Arc<dyn StorageProvider>,
}

impl CategoryStore {
    /// Create the store, rehydrating the persisted snapshot if one
    /// exists.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        let mut state = CategoryState::default();
        match storage.get(STORE_NAME) {
            Ok(Some(raw)) => match serde_json::from_str::<CategorySnapshot>(&raw) {
                Ok(snapshot) => {
                    state.categories = snapshot.categories;
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
    pub fn categories(&self) -> Vec<Category> {
        self.read().categories.clone()
    }

    #[must_use]
    pub fn category_for(&self, key: &IdOrSlug) -> Option<Category> {
        self.read().category_by_key.get(key).cloned()
    }

    #[must_use]
    pub fn products_for(&self, id: CategoryId) -> Option<Vec<Product>> {
        self.read().products_by_category.get(&id.as_i64()).cloned()
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().last_updated
    }

    /// Replace the category list.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn set_categories(&self, categories: Vec<Category>) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            state.categories = categories;
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// Cache a fetched category detail under both its id and its slug.
    /// Not persisted.
    pub fn set_category(&self, category: &Category) {
        let mut state = self.write();
        state
            .category_by_key
            .insert(IdOrSlug::from(category.id), category.clone());
        state
            .category_by_key
            .insert(IdOrSlug::from(category.slug.clone()), category.clone());
    }

    /// Replace the product list cached for one category. Not persisted.
    pub fn set_products_for(&self, id: CategoryId, products: Vec<Product>) {
        self.write()
            .products_by_category
            .insert(id.as_i64(), products);
    }

    /// Add or replace a category by id.
    ///
    /// Unlike product creation this is an upsert: a matching id
    /// replaces the existing entry instead of erroring.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn create_category(&self, category: &Category) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            match state.categories.iter_mut().find(|c| c.id == category.id) {
                Some(slot) => *slot = category.clone(),
                None => state.categories.push(category.clone()),
            }
            state.last_updated = Some(Utc::now());
        }
        self.persist()
    }

    /// Replace an existing category in place; a miss is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let changed = {
            let mut state = self.write();
            let slot = state.categories.iter_mut().find(|c| c.id == category.id);
            match slot {
                Some(slot) => {
                    *slot = category.clone();
                    state
                        .category_by_key
                        .insert(IdOrSlug::from(category.id), category.clone());
                    state
                        .category_by_key
                        .insert(IdOrSlug::from(category.slug.clone()), category.clone());
                    state.last_updated = Some(Utc::now());
                    true
                }
                None => false,
            }
        };
        if changed { self.persist() } else { Ok(()) }
    }

    /// Remove a category and its cached product list.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            let slug = state
                .categories
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.slug.clone());
            state.categories.retain(|c| c.id != id);
            state.products_by_category.remove(&id.as_i64());
            state.category_by_key.remove(&IdOrSlug::from(id));
            if let Some(slug) = slug {
                state.category_by_key.remove(&IdOrSlug::from(slug));
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
        *self.write() = CategoryState::default();
        self.storage.remove(STORE_NAME)?;
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = {
            let state = self.read();
            CategorySnapshot {
                categories: state.categories.clone(),
                last_updated: state.last_updated,
            }
        };
        let raw = serde_json::to_string(&snapshot)?;
        self.storage.set(STORE_NAME, &raw)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CategoryState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CategoryState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
