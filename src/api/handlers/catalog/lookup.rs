//! Read-only lookups the validators run before a write.
//!
//! `CatalogLookup` is the seam between validation rules and the database: the
//! handlers hand the validators a `PgCatalog` borrowed from the open transaction,
//! so every check sees the same snapshot as the write that follows.

use async_trait::async_trait;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

/// Rows still referencing a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryUsage {
    pub children: i64,
    pub books: i64,
}

#[async_trait]
pub trait CatalogLookup: Send {
    async fn author_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error>;

    /// Case-insensitive name match, ignoring `exclude` (the author being updated).
    async fn author_name_taken(
        &mut self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error>;

    /// Number of books linked to the author, `None` when the author does not exist.
    async fn author_book_count(&mut self, id: Uuid) -> Result<Option<i64>, sqlx::Error>;

    async fn nationality_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn category_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn category_level(&mut self, id: Uuid) -> Result<Option<i32>, sqlx::Error>;

    /// Returns `id` itself plus every ancestor reachable through `parent_id`.
    /// Empty when `id` does not exist.
    async fn category_ancestors(&mut self, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>;

    async fn category_usage(&mut self, id: Uuid) -> Result<Option<CategoryUsage>, sqlx::Error>;
}

/// `CatalogLookup` backed by a Postgres connection, normally the one owned by
/// the request transaction.
pub struct PgCatalog<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgCatalog<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CatalogLookup for PgCatalog<'_> {
    async fn author_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1) AS exists")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(row.get("exists"))
    }

    async fn author_name_taken(
        &mut self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r"
            SELECT EXISTS(
                SELECT 1 FROM authors
                WHERE lower(name) = lower($1)
                  AND ($2::uuid IS NULL OR id <> $2)
            ) AS exists
            ",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(row.get("exists"))
    }

    async fn author_book_count(&mut self, id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        let row = sqlx::query(
            r"
            SELECT (SELECT COUNT(*) FROM book_authors ba WHERE ba.author_id = a.id) AS books
            FROM authors a
            WHERE a.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.map(|row| row.get("books")))
    }

    async fn nationality_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM nationalities WHERE id = $1) AS exists")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(row.get("exists"))
    }

    async fn category_exists(&mut self, id: Uuid) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1) AS exists")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(row.get("exists"))
    }

    async fn category_level(&mut self, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        let row = sqlx::query("SELECT level FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.map(|row| row.get("level")))
    }

    async fn category_ancestors(&mut self, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        // UNION (not UNION ALL) stops on rows already seen, so a corrupted
        // parent loop cannot make the walk diverge.
        let rows = sqlx::query(
            r"
            WITH RECURSIVE ancestors(id, parent_id) AS (
                SELECT id, parent_id FROM categories WHERE id = $1
                UNION
                SELECT c.id, c.parent_id
                FROM categories c
                JOIN ancestors a ON c.id = a.parent_id
            )
            SELECT id FROM ancestors
            ",
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    async fn category_usage(&mut self, id: Uuid) -> Result<Option<CategoryUsage>, sqlx::Error> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM categories ch WHERE ch.parent_id = c.id) AS children,
                (SELECT COUNT(*) FROM book_categories bc WHERE bc.category_id = c.id) AS books
            FROM categories c
            WHERE c.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row.map(|row| CategoryUsage {
            children: row.get("children"),
            books: row.get("books"),
        }))
    }
}
