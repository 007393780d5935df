//! Author and category administration plus the read-only catalog listings.
//!
//! Every write runs in a single transaction: the validator checks the payload
//! through `PgCatalog`, the hierarchy helpers derive category levels, one
//! statement persists the row and the enriched entity is read back before
//! commit. The unique name index and `ON DELETE RESTRICT` foreign keys back up
//! the pre-checks when requests race.
//!
//! Layout:
//! - `validate` and `hierarchy` hold the rules and never write.
//! - `lookup` is the read seam those rules run through.
//! - `store` owns the SQL.
//! - `authors`, `categories` and `reference` are the route handlers.

pub(crate) mod authors;
pub(crate) mod categories;
pub mod error;
pub mod hierarchy;
pub mod lookup;
pub(crate) mod reference;
mod store;
pub mod types;
pub mod validate;

use uuid::Uuid;

use error::CatalogError;

const DEFAULT_BOOK_LIMIT: i64 = 50;
const MAX_BOOK_LIMIT: i64 = 200;

/// Parses a required id from a query string or body.
/// `missing` is reported for absent or blank input, `invalid` for non-UUID text.
fn parse_id(
    raw: Option<&str>,
    missing: &'static str,
    invalid: &'static str,
) -> Result<Uuid, CatalogError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CatalogError::Validation(missing))?;
    Uuid::parse_str(raw).map_err(|_| CatalogError::Validation(invalid))
}

#[cfg(test)]
mod test_support;


#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn parse_id_distinguishes_missing_and_invalid() {
        assert!(matches!(
            parse_id(None, "ID is required", "Invalid category ID"),
            Err(CatalogError::Validation("ID is required"))
        ));
        assert!(matches!(
            parse_id(Some("  "), "ID is required", "Invalid category ID"),
            Err(CatalogError::Validation("ID is required"))
        ));
        assert!(matches!(
            parse_id(Some("42"), "ID is required", "Invalid category ID"),
            Err(CatalogError::Validation("Invalid category ID"))
        ));

        let id = Uuid::new_v4();
        assert!(matches!(
            parse_id(Some(&id.to_string()), "ID is required", "Invalid category ID"),
            Ok(parsed) if parsed == id
        ));
    }
}
