//! Read-only listings the admin forms pick from: nationalities, books, stores
//! and store listings.

use axum::{
    Json,
    extract::{Extension, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    DEFAULT_BOOK_LIMIT, MAX_BOOK_LIMIT,
    error::{CatalogError, ErrorBody, query_params},
    store::{fetch_books, fetch_listings, fetch_nationalities, fetch_stores},
    types::{
        BookResponse, BooksQuery, ListingResponse, ListingsQuery, NationalityResponse,
        StoreResponse, StoresQuery,
    },
    validate::normalize_text,
};

/// Clamps the requested page size to `1..=MAX_BOOK_LIMIT`.
fn book_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_BOOK_LIMIT)
        .clamp(1, MAX_BOOK_LIMIT)
}

/// Optional UUID filter; blank means "no filter".
fn optional_id(raw: Option<&str>, invalid: &'static str) -> Result<Option<Uuid>, CatalogError> {
    normalize_text(raw)
        .map(|value| Uuid::parse_str(&value).map_err(|_| CatalogError::Validation(invalid)))
        .transpose()
}

#[utoipa::path(
    get,
    path = "/api/nationalities",
    responses(
        (status = 200, description = "Nationalities ordered by name.", body = [NationalityResponse]),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "reference"
)]
pub async fn list_nationalities(pool: Extension<PgPool>) -> impl IntoResponse {
    match fetch_nationalities(&pool).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/books",
    params(BooksQuery),
    responses(
        (status = 200, description = "Books ordered by title.", body = [BookResponse]),
        (status = 400, description = "Malformed query string.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "reference"
)]
/// Searches books by title or author text.
pub async fn list_books(
    pool: Extension<PgPool>,
    query: Result<Query<BooksQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    let search = normalize_text(query.search.as_deref());
    let author = normalize_text(query.author.as_deref());

    match fetch_books(
        &pool,
        search.as_deref(),
        author.as_deref(),
        book_limit(query.limit),
    )
    .await
    {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/stores",
    params(StoresQuery),
    responses(
        (status = 200, description = "Stores ordered by name.", body = [StoreResponse]),
        (status = 400, description = "Malformed query string.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "reference"
)]
pub async fn list_stores(
    pool: Extension<PgPool>,
    query: Result<Query<StoresQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    match fetch_stores(&pool, query.active.unwrap_or(true)).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingsQuery),
    responses(
        (status = 200, description = "Listings, newest first.", body = [ListingResponse]),
        (status = 400, description = "Malformed filter.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "reference"
)]
/// Lists store offers with the store and book they refer to.
pub async fn list_listings(
    pool: Extension<PgPool>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    let store_id = match optional_id(query.store_id.as_deref(), "Invalid store ID") {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    let book_id = match optional_id(query.book_id.as_deref(), "Invalid book ID") {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match fetch_listings(&pool, store_id, book_id, query.active.unwrap_or(true)).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}
