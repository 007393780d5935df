//! SQL storage for authors, categories and the read-only reference tables.
//!
//! Writes take a `&mut PgConnection` so handlers can run them inside the same
//! transaction as validation. Constraint violations are translated into the
//! catalog conflict messages; the unique index and FK restrictions are the
//! backstop when a concurrent request slips past the validator pre-checks.

use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, Span};
use uuid::Uuid;

use super::{
    error::{CatalogError, is_foreign_key_violation, is_unique_violation, violated_constraint},
    types::{
        AuthorCount, AuthorResponse, BookResponse, CategoryCount, CategoryRef, CategoryResponse,
        ListingBook, ListingResponse, ListingStore, NationalityResponse, StoreResponse,
    },
    validate::{
        AUTHOR_DUPLICATE, AUTHOR_DUPLICATE_ON_UPDATE, AUTHOR_HAS_BOOKS, AUTHOR_NOT_FOUND,
        AuthorDraft, CATEGORY_HAS_BOOKS, CATEGORY_HAS_CHILDREN, CATEGORY_NOT_FOUND, CategoryDraft,
    },
};

const AUTHORS_NAME_INDEX: &str = "authors_name_lower_idx";
const CATEGORIES_PARENT_FK: &str = "categories_parent_id_fkey";

/// Key for `pg_advisory_xact_lock`, shared by every category tree write.
const CATEGORY_TREE_LOCK: i64 = 0x7075_6e74_6f5f_6361;

const AUTHOR_SELECT: &str = r#"
    SELECT a.id, a.name, a.bio, a.birth_date, a.death_date, a.photo_url, a.nationality_id,
        n.name AS nationality_name, n.country_code, n.flag_url,
        to_char(a.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
        to_char(a.updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at,
        (SELECT COUNT(*) FROM book_authors ba WHERE ba.author_id = a.id) AS book_count
    FROM authors a
    LEFT JOIN nationalities n ON n.id = a.nationality_id
"#;

const CATEGORY_SELECT: &str = r"
    SELECT c.id, c.name, c.description, c.color, c.level, c.sort_order, c.parent_id,
        p.name AS parent_name,
        ARRAY(
            SELECT ch.id FROM categories ch WHERE ch.parent_id = c.id
            ORDER BY ch.sort_order, ch.name
        ) AS child_ids,
        ARRAY(
            SELECT ch.name FROM categories ch WHERE ch.parent_id = c.id
            ORDER BY ch.sort_order, ch.name
        ) AS child_names,
        (SELECT COUNT(*) FROM book_categories bc WHERE bc.category_id = c.id) AS book_count,
        (SELECT COUNT(*) FROM categories ch WHERE ch.parent_id = c.id) AS child_count
    FROM categories c
    LEFT JOIN categories p ON p.id = c.parent_id
";

fn query_span(operation: &'static str, statement: &str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn author_from_row(row: &PgRow) -> AuthorResponse {
    let nationality_id: Option<Uuid> = row.get("nationality_id");
    let nationality_name: Option<String> = row.get("nationality_name");
    let nationality = nationality_id
        .zip(nationality_name)
        .map(|(id, name)| NationalityResponse {
            id,
            name,
            country_code: row.get("country_code"),
            flag_url: row.get("flag_url"),
        });

    AuthorResponse {
        id: row.get("id"),
        name: row.get("name"),
        bio: row.get("bio"),
        birth_date: row.get("birth_date"),
        death_date: row.get("death_date"),
        photo_url: row.get("photo_url"),
        nationality_id,
        nationality,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        count: AuthorCount {
            books: row.get("book_count"),
        },
    }
}

fn category_from_row(row: &PgRow) -> CategoryResponse {
    let parent_id: Option<Uuid> = row.get("parent_id");
    let parent_name: Option<String> = row.get("parent_name");
    let child_ids: Vec<Uuid> = row.get("child_ids");
    let child_names: Vec<String> = row.get("child_names");

    CategoryResponse {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        level: row.get("level"),
        sort_order: row.get("sort_order"),
        parent_id,
        parent: parent_id
            .zip(parent_name)
            .map(|(id, name)| CategoryRef { id, name }),
        children: child_ids
            .into_iter()
            .zip(child_names)
            .map(|(id, name)| CategoryRef { id, name })
            .collect(),
        count: CategoryCount {
            books: row.get("book_count"),
            children: row.get("child_count"),
        },
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub(super) fn like_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// All authors with nationality and book count, ordered by name.
pub(super) async fn fetch_authors(pool: &PgPool) -> Result<Vec<AuthorResponse>, sqlx::Error> {
    let query = format!("{AUTHOR_SELECT} ORDER BY a.name");
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(rows.iter().map(author_from_row).collect())
}

pub(super) async fn fetch_author(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<AuthorResponse>, sqlx::Error> {
    let query = format!("{AUTHOR_SELECT} WHERE a.id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(conn)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(row.as_ref().map(author_from_row))
}

/// Inserts a validated author and returns its id.
pub(super) async fn insert_author(
    conn: &mut PgConnection,
    draft: &AuthorDraft,
) -> Result<Uuid, CatalogError> {
    let query = r"
        INSERT INTO authors (name, bio, birth_date, death_date, photo_url, nationality_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ";
    let result = sqlx::query(query)
        .bind(&draft.name)
        .bind(&draft.bio)
        .bind(draft.birth_date)
        .bind(draft.death_date)
        .bind(&draft.photo_url)
        .bind(draft.nationality_id)
        .fetch_one(conn)
        .instrument(query_span("INSERT", query))
        .await;

    match result {
        Ok(row) => Ok(row.get("id")),
        Err(err) if is_unique_violation(&err, AUTHORS_NAME_INDEX) => {
            Err(CatalogError::Conflict(AUTHOR_DUPLICATE))
        }
        Err(err) => Err(CatalogError::Database(err)),
    }
}

/// Replaces every writable field of an author and bumps `updated_at`.
pub(super) async fn update_author(
    conn: &mut PgConnection,
    id: Uuid,
    draft: &AuthorDraft,
) -> Result<(), CatalogError> {
    let query = r"
        UPDATE authors
        SET name = $2, bio = $3, birth_date = $4, death_date = $5,
            photo_url = $6, nationality_id = $7, updated_at = NOW()
        WHERE id = $1
    ";
    let result = sqlx::query(query)
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.bio)
        .bind(draft.birth_date)
        .bind(draft.death_date)
        .bind(&draft.photo_url)
        .bind(draft.nationality_id)
        .execute(conn)
        .instrument(query_span("UPDATE", query))
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(CatalogError::NotFound(AUTHOR_NOT_FOUND)),
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err, AUTHORS_NAME_INDEX) => {
            Err(CatalogError::Conflict(AUTHOR_DUPLICATE_ON_UPDATE))
        }
        Err(err) => Err(CatalogError::Database(err)),
    }
}

pub(super) async fn delete_author(conn: &mut PgConnection, id: Uuid) -> Result<(), CatalogError> {
    let query = "DELETE FROM authors WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .execute(conn)
        .instrument(query_span("DELETE", query))
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(CatalogError::NotFound(AUTHOR_NOT_FOUND)),
        Ok(_) => Ok(()),
        Err(err) if is_foreign_key_violation(&err) => Err(CatalogError::Conflict(AUTHOR_HAS_BOOKS)),
        Err(err) => Err(CatalogError::Database(err)),
    }
}

/// All categories ordered by `level, sort_order, name`, with parent, children and counts.
pub(super) async fn fetch_categories(
    pool: &PgPool,
) -> Result<Vec<CategoryResponse>, sqlx::Error> {
    let query = format!("{CATEGORY_SELECT} ORDER BY c.level, c.sort_order, c.name");
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(rows.iter().map(category_from_row).collect())
}

pub(super) async fn fetch_category(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<CategoryResponse>, sqlx::Error> {
    let query = format!("{CATEGORY_SELECT} WHERE c.id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(conn)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(row.as_ref().map(category_from_row))
}

/// Serializes category tree writes until the surrounding transaction ends.
pub(super) async fn lock_category_tree(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    let query = "SELECT pg_advisory_xact_lock($1)";
    sqlx::query(query)
        .bind(CATEGORY_TREE_LOCK)
        .execute(conn)
        .instrument(query_span("SELECT", query))
        .await?;
    Ok(())
}

pub(super) async fn insert_category(
    conn: &mut PgConnection,
    draft: &CategoryDraft,
) -> Result<Uuid, CatalogError> {
    let query = r"
        INSERT INTO categories (name, description, color, parent_id, level, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ";
    let row = sqlx::query(query)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.color)
        .bind(draft.parent_id)
        .bind(draft.level)
        .bind(draft.sort_order)
        .fetch_one(conn)
        .instrument(query_span("INSERT", query))
        .await?;
    Ok(row.get("id"))
}

pub(super) async fn update_category(
    conn: &mut PgConnection,
    id: Uuid,
    draft: &CategoryDraft,
) -> Result<(), CatalogError> {
    let query = r"
        UPDATE categories
        SET name = $2, description = $3, color = $4, parent_id = $5,
            level = $6, sort_order = $7, updated_at = NOW()
        WHERE id = $1
    ";
    let done = sqlx::query(query)
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.color)
        .bind(draft.parent_id)
        .bind(draft.level)
        .bind(draft.sort_order)
        .execute(conn)
        .instrument(query_span("UPDATE", query))
        .await?;

    if done.rows_affected() == 0 {
        return Err(CatalogError::NotFound(CATEGORY_NOT_FOUND));
    }
    Ok(())
}

/// Recomputes `level` for every descendant of `id` from its (already updated) level.
/// Returns the number of rows whose level changed.
pub(super) async fn refresh_descendant_levels(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let query = r"
        WITH RECURSIVE subtree(id, level, path) AS (
            SELECT id, level, ARRAY[id] FROM categories WHERE id = $1
            UNION ALL
            SELECT c.id, s.level + 1, s.path || c.id
            FROM categories c
            JOIN subtree s ON c.parent_id = s.id
            WHERE NOT c.id = ANY(s.path)
        )
        UPDATE categories c
        SET level = subtree.level, updated_at = NOW()
        FROM subtree
        WHERE c.id = subtree.id AND c.id <> $1 AND c.level <> subtree.level
    ";
    let done = sqlx::query(query)
        .bind(id)
        .execute(conn)
        .instrument(query_span("UPDATE", query))
        .await?;
    Ok(done.rows_affected())
}

pub(super) async fn delete_category(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<(), CatalogError> {
    let query = "DELETE FROM categories WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .execute(conn)
        .instrument(query_span("DELETE", query))
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(CatalogError::NotFound(CATEGORY_NOT_FOUND)),
        Ok(_) => Ok(()),
        Err(err) if is_foreign_key_violation(&err) => {
            if violated_constraint(&err) == Some(CATEGORIES_PARENT_FK) {
                Err(CatalogError::Conflict(CATEGORY_HAS_CHILDREN))
            } else {
                Err(CatalogError::Conflict(CATEGORY_HAS_BOOKS))
            }
        }
        Err(err) => Err(CatalogError::Database(err)),
    }
}

pub(super) async fn fetch_nationalities(
    pool: &PgPool,
) -> Result<Vec<NationalityResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r"
        SELECT id, name, country_code, flag_url
        FROM nationalities
        ORDER BY name
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| NationalityResponse {
            id: row.get("id"),
            name: row.get("name"),
            country_code: row.get("country_code"),
            flag_url: row.get("flag_url"),
        })
        .collect())
}

/// Books ordered by title. `search` matches title or author, `author` only the author.
pub(super) async fn fetch_books(
    pool: &PgPool,
    search: Option<&str>,
    author: Option<&str>,
    limit: i64,
) -> Result<Vec<BookResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r"
        SELECT id, title, author, isbn, summary, language, published_at
        FROM books
        WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
          AND ($2::text IS NULL OR author ILIKE $2)
        ORDER BY title
        LIMIT $3
        ",
    )
    .bind(search.map(like_pattern))
    .bind(author.map(like_pattern))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| BookResponse {
            id: row.get("id"),
            title: row.get("title"),
            author: row.get("author"),
            isbn: row.get("isbn"),
            summary: row.get("summary"),
            language: row.get("language"),
            published_at: row.get("published_at"),
        })
        .collect())
}

pub(super) async fn fetch_stores(
    pool: &PgPool,
    active: bool,
) -> Result<Vec<StoreResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, city, address, active,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM stores
        WHERE active = $1
        ORDER BY name
        "#,
    )
    .bind(active)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| StoreResponse {
            id: row.get("id"),
            name: row.get("name"),
            city: row.get("city"),
            address: row.get("address"),
            active: row.get("active"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Listings with their store and book summaries, newest first.
pub(super) async fn fetch_listings(
    pool: &PgPool,
    store_id: Option<Uuid>,
    book_id: Option<Uuid>,
    active: bool,
) -> Result<Vec<ListingResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT l.id, l.store_id, l.book_id, l.price_cents, l.currency, l.stock, l.active,
            to_char(l.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            s.name AS store_name, s.city AS store_city,
            b.title AS book_title, b.author AS book_author
        FROM listings l
        JOIN stores s ON s.id = l.store_id
        JOIN books b ON b.id = l.book_id
        WHERE l.active = $1
          AND ($2::uuid IS NULL OR l.store_id = $2)
          AND ($3::uuid IS NULL OR l.book_id = $3)
        ORDER BY l.created_at DESC
        "#,
    )
    .bind(active)
    .bind(store_id)
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ListingResponse {
            id: row.get("id"),
            store_id: row.get("store_id"),
            book_id: row.get("book_id"),
            price_cents: row.get("price_cents"),
            currency: row.get("currency"),
            stock: row.get("stock"),
            active: row.get("active"),
            created_at: row.get("created_at"),
            store: ListingStore {
                name: row.get("store_name"),
                city: row.get("store_city"),
            },
            book: ListingBook {
                title: row.get("book_title"),
                author: row.get("book_author"),
            },
        })
        .collect())
}
