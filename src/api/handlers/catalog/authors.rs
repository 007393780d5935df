//! Author CRUD handlers.

use axum::{
    Json,
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{
    error::{CatalogError, ErrorBody, json_body, query_params},
    lookup::PgCatalog,
    parse_id,
    store::{delete_author, fetch_author, fetch_authors, insert_author, update_author},
    types::{AuthorPayload, AuthorResponse, IdQuery, MessageResponse, UpdateAuthorRequest},
    validate::{AUTHOR_NOT_FOUND, validate_author_delete, validate_author_write},
};

const AUTHOR_ID_REQUIRED: &str = "Author ID is required";
const INVALID_AUTHOR_ID: &str = "Invalid author ID";

#[utoipa::path(
    get,
    path = "/api/authors",
    responses(
        (status = 200, description = "Authors ordered by name.", body = [AuthorResponse]),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "authors"
)]
/// Lists every author with nationality and book count.
pub async fn list_authors(pool: Extension<PgPool>) -> impl IntoResponse {
    match fetch_authors(&pool).await {
        Ok(authors) => (StatusCode::OK, Json(authors)).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/authors",
    request_body = AuthorPayload,
    responses(
        (status = 201, description = "Author created.", body = AuthorResponse),
        (status = 400, description = "Invalid input or duplicate name.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "authors"
)]
/// Creates an author. Names are unique ignoring case.
pub async fn create_author(
    pool: Extension<PgPool>,
    payload: Result<Json<AuthorPayload>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };

    match write_author(&pool, &payload, None).await {
        Ok(author) => {
            info!(author_id = %author.id, "Author created");
            (StatusCode::CREATED, Json(author)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/authors",
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Author updated.", body = AuthorResponse),
        (status = 400, description = "Invalid input or duplicate name.", body = ErrorBody),
        (status = 404, description = "Author not found.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "authors"
)]
/// Replaces an author's fields. The body carries the id next to the author fields.
pub async fn update_author_handler(
    pool: Extension<PgPool>,
    payload: Result<Json<UpdateAuthorRequest>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };
    let id = match parse_id(payload.id.as_deref(), AUTHOR_ID_REQUIRED, INVALID_AUTHOR_ID) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match write_author(&pool, &payload.author, Some(id)).await {
        Ok(author) => {
            info!(author_id = %author.id, "Author updated");
            (StatusCode::OK, Json(author)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/authors",
    params(IdQuery),
    responses(
        (status = 200, description = "Author deleted.", body = MessageResponse),
        (status = 400, description = "Missing id or author still has books.", body = ErrorBody),
        (status = 404, description = "Author not found.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "authors"
)]
/// Deletes an author that no book references.
pub async fn delete_author_handler(
    pool: Extension<PgPool>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    let id = match parse_id(query.id.as_deref(), AUTHOR_ID_REQUIRED, INVALID_AUTHOR_ID) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match remove_author(&pool, id).await {
        Ok(()) => {
            info!(author_id = %id, "Author deleted");
            (
                StatusCode::OK,
                Json(MessageResponse::new("Author deleted successfully")),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn write_author(
    pool: &PgPool,
    payload: &AuthorPayload,
    existing_id: Option<Uuid>,
) -> Result<AuthorResponse, CatalogError> {
    let mut tx = pool.begin().await?;

    let draft = validate_author_write(&mut PgCatalog::new(&mut tx), payload, existing_id).await?;

    let id = match existing_id {
        Some(id) => {
            update_author(&mut tx, id, &draft).await?;
            id
        }
        None => insert_author(&mut tx, &draft).await?,
    };

    let author = fetch_author(&mut tx, id)
        .await?
        .ok_or(CatalogError::NotFound(AUTHOR_NOT_FOUND))?;

    tx.commit().await?;
    Ok(author)
}

async fn remove_author(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    let mut tx = pool.begin().await?;
    validate_author_delete(&mut PgCatalog::new(&mut tx), id).await?;
    delete_author(&mut tx, id).await?;
    tx.commit().await?;
    Ok(())
}
