//! Category CRUD handlers and the nested tree view.
//!
//! Tree writes take the category advisory lock before validating, so the
//! level derivation and the cycle walk see a parent chain no concurrent
//! request can change until commit.

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
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    error::{CatalogError, ErrorBody, json_body, query_params},
    hierarchy::build_tree,
    lookup::PgCatalog,
    parse_id,
    store::{
        delete_category, fetch_categories, fetch_category, insert_category, lock_category_tree,
        refresh_descendant_levels, update_category,
    },
    types::{
        CategoryNode, CategoryPayload, CategoryResponse, IdQuery, MessageResponse,
        UpdateCategoryRequest,
    },
    validate::{
        CATEGORY_NOT_FOUND, normalize_text, validate_category_delete, validate_category_write,
    },
};

const ID_AND_NAME_REQUIRED: &str = "ID and name are required";
const ID_REQUIRED: &str = "ID is required";
const INVALID_CATEGORY_ID: &str = "Invalid category ID";

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Categories ordered by level, sort order and name.", body = [CategoryResponse]),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Lists categories flat, each with its parent, direct children and counts.
pub async fn list_categories(pool: Extension<PgPool>) -> impl IntoResponse {
    match fetch_categories(&pool).await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/categories/tree",
    responses(
        (status = 200, description = "Root categories with nested children.", body = [CategoryNode]),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Returns the category forest, siblings ordered by `sort_order`.
pub async fn category_tree(pool: Extension<PgPool>) -> impl IntoResponse {
    match fetch_categories(&pool).await {
        Ok(categories) => (StatusCode::OK, Json(build_tree(&categories))).into_response(),
        Err(err) => CatalogError::from(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Category created.", body = CategoryResponse),
        (status = 400, description = "Invalid input or parent.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Creates a category; its level is derived from the parent.
pub async fn create_category(
    pool: Extension<PgPool>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };

    match write_category(&pool, &payload, None).await {
        Ok(category) => {
            info!(category_id = %category.id, level = category.level, "Category created");
            (StatusCode::CREATED, Json(category)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/api/categories",
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated.", body = CategoryResponse),
        (status = 400, description = "Invalid input, parent or cycle.", body = ErrorBody),
        (status = 404, description = "Category not found.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Replaces a category's fields. Moving it re-derives the level of its whole subtree.
pub async fn update_category_handler(
    pool: Extension<PgPool>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(err) => return err.into_response(),
    };
    if normalize_text(payload.category.name.as_deref()).is_none() {
        return CatalogError::Validation(ID_AND_NAME_REQUIRED).into_response();
    }
    let id = match parse_id(payload.id.as_deref(), ID_AND_NAME_REQUIRED, INVALID_CATEGORY_ID) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match write_category(&pool, &payload.category, Some(id)).await {
        Ok(category) => {
            info!(category_id = %category.id, level = category.level, "Category updated");
            (StatusCode::OK, Json(category)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/api/categories",
    params(IdQuery),
    responses(
        (status = 200, description = "Category deleted.", body = MessageResponse),
        (status = 400, description = "Missing id, subcategories or books still attached.", body = ErrorBody),
        (status = 404, description = "Category not found.", body = ErrorBody),
        (status = 500, description = "Database failure.", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Deletes a category with no subcategories and no books.
pub async fn delete_category_handler(
    pool: Extension<PgPool>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    let id = match parse_id(query.id.as_deref(), ID_REQUIRED, INVALID_CATEGORY_ID) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match remove_category(&pool, id).await {
        Ok(()) => {
            info!(category_id = %id, "Category deleted");
            (
                StatusCode::OK,
                Json(MessageResponse::new("Category deleted successfully")),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn write_category(
    pool: &PgPool,
    payload: &CategoryPayload,
    existing_id: Option<Uuid>,
) -> Result<CategoryResponse, CatalogError> {
    let mut tx = pool.begin().await?;
    lock_category_tree(&mut tx).await?;

    let draft =
        validate_category_write(&mut PgCatalog::new(&mut tx), payload, existing_id).await?;

    let id = match existing_id {
        Some(id) => {
            update_category(&mut tx, id, &draft).await?;
            let moved = refresh_descendant_levels(&mut tx, id).await?;
            if moved > 0 {
                debug!(category_id = %id, descendants = moved, "Refreshed descendant levels");
            }
            id
        }
        None => insert_category(&mut tx, &draft).await?,
    };

    let category = fetch_category(&mut tx, id)
        .await?
        .ok_or(CatalogError::NotFound(CATEGORY_NOT_FOUND))?;

    tx.commit().await?;
    Ok(category)
}

async fn remove_category(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    let mut tx = pool.begin().await?;
    lock_category_tree(&mut tx).await?;
    validate_category_delete(&mut PgCatalog::new(&mut tx), id).await?;
    delete_category(&mut tx, id).await?;
    tx.commit().await?;
    Ok(())
}
