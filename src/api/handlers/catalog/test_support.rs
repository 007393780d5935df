//! In-memory `CatalogLookup` used by validator and hierarchy unit tests.

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use super::lookup::{CatalogLookup, CategoryUsage};

#[derive(Debug, Clone)]
struct MemoryAuthor {
    id: Uuid,
    name: String,
    books: i64,
}

#[derive(Debug, Clone)]
struct MemoryCategory {
    id: Uuid,
    parent_id: Option<Uuid>,
    level: i32,
    books: i64,
}

#[derive(Debug, Default)]
pub(super) struct MemoryCatalog {
    authors: Vec<MemoryAuthor>,
    nationalities: Vec<Uuid>,
    categories: Vec<MemoryCategory>,
}

impl MemoryCatalog {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn add_author(&mut self, name: &str, books: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.authors.push(MemoryAuthor {
            id,
            name: name.to_string(),
            books,
        });
        id
    }

    pub(super) fn add_nationality(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.nationalities.push(id);
        id
    }

    /// Adds a category under `parent_id`, deriving its level like a validated insert would.
    pub(super) fn add_category(&mut self, parent_id: Option<Uuid>, books: i64) -> Uuid {
        let level = parent_id
            .and_then(|parent| self.category(parent))
            .map_or(0, |parent| parent.level + 1);
        let id = Uuid::new_v4();
        self.categories.push(MemoryCategory {
            id,
            parent_id,
            level,
            books,
        });
        id
    }

    /// Rewrites a parent link without any checks, to model corrupted data.
    pub(super) fn force_parent(&mut self, id: Uuid, parent_id: Option<Uuid>) {
        if let Some(category) = self.categories.iter_mut().find(|c| c.id == id) {
            category.parent_id = parent_id;
        }
    }

    fn category(&self, id: Uuid) -> Option<&MemoryCategory> {
        self.categories.iter().find(|c| c.id == id)
    }
}

#[async_trait]
impl CatalogLookup for MemoryCatalog {
    async fn author_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self.authors.iter().any(|a| a.id == id))
    }

    async fn author_name_taken(
        &mut self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let name = name.to_lowercase();
        Ok(self
            .authors
            .iter()
            .any(|a| a.name.to_lowercase() == name && Some(a.id) != exclude))
    }

    async fn author_book_count(&mut self, id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        Ok(self.authors.iter().find(|a| a.id == id).map(|a| a.books))
    }

    async fn nationality_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self.nationalities.contains(&id))
    }

    async fn category_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self.category(id).is_some())
    }

    async fn category_level(&mut self, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        Ok(self.category(id).map(|c| c.level))
    }

    async fn category_ancestors(&mut self, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut cursor = self.category(id);
        while let Some(category) = cursor {
            if !seen.insert(category.id) {
                break;
            }
            chain.push(category.id);
            cursor = category.parent_id.and_then(|parent| self.category(parent));
        }
        Ok(chain)
    }

    async fn category_usage(&mut self, id: Uuid) -> Result<Option<CategoryUsage>, sqlx::Error> {
        let Some(category) = self.category(id) else {
            return Ok(None);
        };
        let children = self
            .categories
            .iter()
            .filter(|c| c.parent_id == Some(id))
            .count();
        Ok(Some(CategoryUsage {
            children: i64::try_from(children).unwrap_or(i64::MAX),
            books: category.books,
        }))
    }
}
