//! Category service
//!
//! Categories are labels only; they never affect balances.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId};
use crate::storage::Storage;

/// Service for category management
pub struct CategoryService<'a> {
    storage: &'a Storage,
}

impl<'a> CategoryService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a category, optionally under an existing parent
    pub fn create(&self, name: &str, parent_id: Option<CategoryId>) -> LedgerResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation(
                "Category name cannot be empty".into(),
            ));
        }

        if let Some(parent_id) = parent_id {
            if !self.storage.categories().exists(parent_id)? {
                return Err(LedgerError::category_not_found(parent_id.to_string()));
            }
        }

        let category = self.storage.categories().insert(name, parent_id)?;

        self.storage.log_create(
            EntityType::Category,
            category.id.to_string(),
            Some(category.name.clone()),
            &category,
        );

        Ok(category)
    }

    pub fn get(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        self.storage.categories().get(id)
    }

    /// Find a category by name (case-insensitive) or id (`cat-2` or `2`)
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Category>> {
        if let Some(category) = self.storage.categories().get_by_name(identifier)? {
            return Ok(Some(category));
        }

        if let Ok(id) = identifier.parse::<CategoryId>() {
            return self.storage.categories().get(id);
        }

        Ok(None)
    }

    /// Like [`find`](Self::find) but absence is an error
    pub fn resolve(&self, identifier: &str) -> LedgerResult<Category> {
        self.find(identifier)?
            .ok_or_else(|| LedgerError::category_not_found(identifier))
    }

    pub fn list(&self) -> LedgerResult<Vec<Category>> {
        self.storage.categories().list()
    }
}
