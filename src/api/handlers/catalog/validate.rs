//! Entity validation for author and category writes.
//!
//! Validators normalize the incoming payload (trimmed strings, blanks coerced to
//! `None`, dates parsed) and run the existence and uniqueness checks through a
//! `CatalogLookup`. They never mutate anything; the caller performs the write in
//! the same transaction once a draft comes back.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use url::Url;
use uuid::Uuid;

use super::{
    error::CatalogError,
    hierarchy::{compute_level, ensure_acyclic},
    lookup::CatalogLookup,
    types::{AuthorPayload, CategoryPayload},
};

pub(super) const AUTHOR_NAME_REQUIRED: &str = "Author name is required";
pub(super) const AUTHOR_NOT_FOUND: &str = "Author not found";
pub(super) const AUTHOR_DUPLICATE: &str = "An author with this name already exists";
pub(super) const AUTHOR_DUPLICATE_ON_UPDATE: &str = "Another author with this name already exists";
pub(super) const AUTHOR_HAS_BOOKS: &str = "Cannot delete author: has associated books";
pub(super) const CATEGORY_NAME_REQUIRED: &str = "Name is required";
pub(super) const CATEGORY_NOT_FOUND: &str = "Category not found";
pub(super) const CATEGORY_HAS_CHILDREN: &str = "Cannot delete category with subcategories";
pub(super) const CATEGORY_HAS_BOOKS: &str = "Cannot delete category with associated books";

const INVALID_BIRTH_DATE: &str = "Invalid birth date format";
const INVALID_DEATH_DATE: &str = "Invalid death date format";
const DEATH_BEFORE_BIRTH: &str = "Death date cannot be before birth date";
const INVALID_PHOTO_URL: &str = "Invalid photo URL";
const INVALID_NATIONALITY: &str = "Invalid nationality selected";
const INVALID_COLOR: &str = "Invalid color format";
const INVALID_PARENT: &str = "Invalid parent category";

/// Normalized author ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDraft {
    pub name: String,
    pub bio: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    pub nationality_id: Option<Uuid>,
}

/// Normalized category with its derived `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub sort_order: i32,
}

/// Trims `value` and maps blank strings to `None`.
pub(super) fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, taking the timestamp's UTC calendar date.
pub(super) fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Hex colors as used by the admin UI: `#rgb` or `#rrggbb`.
pub(super) fn valid_color(color: &str) -> bool {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").is_ok_and(|re| re.is_match(color))
}

/// Photo URLs must be absolute `http`/`https` URLs with a host.
pub(super) fn valid_photo_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

/// Validates an author create (`existing_id == None`) or update.
///
/// # Errors
/// Returns `Validation` for malformed input, `NotFound` when the updated author is
/// missing, `Conflict` for a case-insensitive name clash and `Database` when a lookup fails.
pub async fn validate_author_write<L>(
    lookup: &mut L,
    payload: &AuthorPayload,
    existing_id: Option<Uuid>,
) -> Result<AuthorDraft, CatalogError>
where
    L: CatalogLookup + ?Sized,
{
    let name = normalize_text(payload.name.as_deref())
        .ok_or(CatalogError::Validation(AUTHOR_NAME_REQUIRED))?;

    if let Some(id) = existing_id {
        if !lookup.author_exists(id).await? {
            return Err(CatalogError::NotFound(AUTHOR_NOT_FOUND));
        }
    }

    if lookup.author_name_taken(&name, existing_id).await? {
        return Err(CatalogError::Conflict(if existing_id.is_some() {
            AUTHOR_DUPLICATE_ON_UPDATE
        } else {
            AUTHOR_DUPLICATE
        }));
    }

    let birth_date = match normalize_text(payload.birth_date.as_deref()) {
        Some(raw) => Some(
            parse_calendar_date(&raw).ok_or(CatalogError::Validation(INVALID_BIRTH_DATE))?,
        ),
        None => None,
    };
    let death_date = match normalize_text(payload.death_date.as_deref()) {
        Some(raw) => Some(
            parse_calendar_date(&raw).ok_or(CatalogError::Validation(INVALID_DEATH_DATE))?,
        ),
        None => None,
    };

    if let (Some(birth), Some(death)) = (birth_date, death_date) {
        if death < birth {
            return Err(CatalogError::Validation(DEATH_BEFORE_BIRTH));
        }
    }

    let photo_url = normalize_text(payload.photo_url.as_deref());
    if photo_url.as_deref().is_some_and(|url| !valid_photo_url(url)) {
        return Err(CatalogError::Validation(INVALID_PHOTO_URL));
    }

    let nationality_id = match normalize_text(payload.nationality_id.as_deref()) {
        Some(raw) => {
            let id =
                Uuid::parse_str(&raw).map_err(|_| CatalogError::Validation(INVALID_NATIONALITY))?;
            if !lookup.nationality_exists(id).await? {
                return Err(CatalogError::Validation(INVALID_NATIONALITY));
            }
            Some(id)
        }
        None => None,
    };

    Ok(AuthorDraft {
        name,
        bio: normalize_text(payload.bio.as_deref()),
        birth_date,
        death_date,
        photo_url,
        nationality_id,
    })
}

/// Checks that an author exists and has no books before it is deleted.
///
/// # Errors
/// Returns `NotFound`, `Conflict` or `Database`.
pub async fn validate_author_delete<L>(lookup: &mut L, id: Uuid) -> Result<(), CatalogError>
where
    L: CatalogLookup + ?Sized,
{
    match lookup.author_book_count(id).await? {
        None => Err(CatalogError::NotFound(AUTHOR_NOT_FOUND)),
        Some(books) if books > 0 => Err(CatalogError::Conflict(AUTHOR_HAS_BOOKS)),
        Some(_) => Ok(()),
    }
}

/// Validates a category create (`existing_id == None`) or update and derives its level.
///
/// # Errors
/// Returns `Validation` for malformed input, dangling parents and parent cycles,
/// `NotFound` when the updated category is missing, and `Database` when a lookup fails.
pub async fn validate_category_write<L>(
    lookup: &mut L,
    payload: &CategoryPayload,
    existing_id: Option<Uuid>,
) -> Result<CategoryDraft, CatalogError>
where
    L: CatalogLookup + ?Sized,
{
    let name = normalize_text(payload.name.as_deref())
        .ok_or(CatalogError::Validation(CATEGORY_NAME_REQUIRED))?;

    if let Some(id) = existing_id {
        if !lookup.category_exists(id).await? {
            return Err(CatalogError::NotFound(CATEGORY_NOT_FOUND));
        }
    }

    let color = normalize_text(payload.color.as_deref());
    if color.as_deref().is_some_and(|color| !valid_color(color)) {
        return Err(CatalogError::Validation(INVALID_COLOR));
    }

    let parent_id = match normalize_text(payload.parent_id.as_deref()) {
        Some(raw) => {
            Some(Uuid::parse_str(&raw).map_err(|_| CatalogError::Validation(INVALID_PARENT))?)
        }
        None => None,
    };

    let level = compute_level(lookup, parent_id).await?;
    if let Some(id) = existing_id {
        ensure_acyclic(lookup, id, parent_id).await?;
    }

    Ok(CategoryDraft {
        name,
        description: normalize_text(payload.description.as_deref()),
        color,
        parent_id,
        level,
        sort_order: payload.sort_order.unwrap_or(0),
    })
}

/// Checks that a category exists and nothing references it before it is deleted.
/// Subcategories are reported before books.
///
/// # Errors
/// Returns `NotFound`, `Conflict` or `Database`.
pub async fn validate_category_delete<L>(lookup: &mut L, id: Uuid) -> Result<(), CatalogError>
where
    L: CatalogLookup + ?Sized,
{
    let usage = lookup
        .category_usage(id)
        .await?
        .ok_or(CatalogError::NotFound(CATEGORY_NOT_FOUND))?;

    if usage.children > 0 {
        return Err(CatalogError::Conflict(CATEGORY_HAS_CHILDREN));
    }
    if usage.books > 0 {
        return Err(CatalogError::Conflict(CATEGORY_HAS_BOOKS));
    }
    Ok(())
}
