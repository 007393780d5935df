//! Request/response types for the catalog APIs.
//!
//! These payloads are shared between handlers, storage and `OpenAPI` generation.
//! Relation counts are serialized under `_count` to keep the shape the admin UI expects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Author fields accepted on create and update. Every field is optional at the
/// wire level so missing values reach the validator instead of failing deserialization.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct AuthorPayload {
    pub name: Option<String>,
    pub bio: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub birth_date: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub death_date: Option<String>,
    pub photo_url: Option<String>,
    pub nationality_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateAuthorRequest {
    pub id: Option<String>,
    #[serde(flatten)]
    pub author: AuthorPayload,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `#rgb` or `#rrggbb`.
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub id: Option<String>,
    #[serde(flatten)]
    pub category: CategoryPayload,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    /// Record id (UUID).
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BooksQuery {
    /// Case-insensitive match on title or author.
    pub search: Option<String>,
    /// Case-insensitive match on author only.
    pub author: Option<String>,
    /// Maximum number of rows, defaults to 50.
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StoresQuery {
    /// Defaults to `true`.
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingsQuery {
    pub store_id: Option<String>,
    pub book_id: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NationalityResponse {
    pub id: Uuid,
    pub name: String,
    pub country_code: Option<String>,
    pub flag_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AuthorCount {
    pub books: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    pub nationality_id: Option<Uuid>,
    pub nationality: Option<NationalityResponse>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(rename = "_count")]
    pub count: AuthorCount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct CategoryCount {
    pub books: i64,
    pub children: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub level: i32,
    pub sort_order: i32,
    pub parent_id: Option<Uuid>,
    pub parent: Option<CategoryRef>,
    pub children: Vec<CategoryRef>,
    #[serde(rename = "_count")]
    pub count: CategoryCount,
}

/// Nested view of the category tree, roots first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryNode {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub level: i32,
    pub sort_order: i32,
    #[serde(rename = "_count")]
    pub count: CategoryCount,
    #[schema(no_recursion)]
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub summary: Option<String>,
    pub language: Option<String>,
    pub published_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoreResponse {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingStore {
    pub name: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingBook {
    pub title: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingResponse {
    pub id: Uuid,
    pub store_id: Uuid,
    pub book_id: Uuid,
    pub price_cents: i64,
    pub currency: String,
    pub stock: i32,
    pub active: bool,
    pub created_at: String,
    #[serde(rename = "stores")]
    pub store: ListingStore,
    #[serde(rename = "books")]
    pub book: ListingBook,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
