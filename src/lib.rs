//! # Punto Lector (Bookstore Catalog API)
//!
//! `puntolector` is the administrative REST API behind the Punto Lector
//! bookstore catalog. It manages authors, categories and the read-only
//! reference data (nationalities, books, stores, listings) stored in
//! PostgreSQL, and proxies image uploads to an object storage bucket.
//!
//! ## Validation Core
//!
//! Every author and category write is validated inside the same database
//! transaction that performs it:
//!
//! - **Authors:** names are unique case-insensitively, dates must parse and be
//!   ordered (death never before birth), and referenced nationalities must exist.
//!   A unique index on `lower(name)` is the authoritative backstop.
//! - **Categories:** `level` is derived from the parent (`0` for roots,
//!   `parent.level + 1` otherwise). Re-parenting refreshes descendant levels and
//!   is rejected when it would nest a category under its own subtree.
//! - **Deletes:** authors with books, and categories with subcategories or books,
//!   cannot be deleted.
//!
//! ## Errors
//!
//! Validation and conflict failures answer `400`, missing records `404`, and
//! unexpected failures `500` with a generic `{ "error": ... }` body. Details of
//! unexpected failures are only written to the logs.

pub mod api;
pub mod cli;
pub mod media;

#[cfg(test)]
mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
