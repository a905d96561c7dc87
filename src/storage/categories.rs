//! Category repository

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId};

pub struct CategoryRepository<'c> {
    conn: &'c Connection,
}

impl<'c> CategoryRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, name: &str, parent_id: Option<CategoryId>) -> LedgerResult<Category> {
        let now = Utc::now();
        match self.conn.execute(
            "INSERT INTO categories (name, parent_id, created_at) VALUES (?1, ?2, ?3)",
            params![name, parent_id, now],
        ) {
            Ok(_) => Ok(Category {
                id: CategoryId::new(self.conn.last_insert_rowid()),
                name: name.to_string(),
                parent_id,
                created_at: now,
            }),
            Err(e) if super::is_unique_violation(&e) => Err(LedgerError::Duplicate {
                entity_type: "Category",
                identifier: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, parent_id, created_at FROM categories WHERE id = ?1",
                [id],
                row_to_category,
            )
            .optional()?)
    }

    pub fn get_by_name(&self, name: &str) -> LedgerResult<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, parent_id, created_at FROM categories WHERE name = ?1",
                [name.trim()],
                row_to_category,
            )
            .optional()?)
    }

    pub fn exists(&self, id: CategoryId) -> LedgerResult<bool> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM categories WHERE id = ?1", [id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    pub fn list(&self) -> LedgerResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, parent_id, created_at FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    #[test]
    fn test_insert_and_lookup() {
        let storage = Storage::open_in_memory().unwrap();
        let repo = storage.categories();

        let food = repo.insert("Food", None).unwrap();
        let groceries = repo.insert("Groceries", Some(food.id)).unwrap();

        assert!(repo.exists(groceries.id).unwrap());
        assert_eq!(repo.get(groceries.id).unwrap().unwrap().parent_id, Some(food.id));
        assert_eq!(repo.get_by_name("FOOD").unwrap().unwrap().id, food.id);
        assert_eq!(repo.list().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_parent_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        let err = storage
            .categories()
            .insert("Orphan", Some(CategoryId::new(9)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        storage.categories().insert("Rent", None).unwrap();
        let err = storage.categories().insert("rent", None).unwrap_err();
        assert!(matches!(err, LedgerError::Duplicate { .. }));
    }
}
