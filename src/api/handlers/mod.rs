//! API handlers for the catalog service.
//!
//! `catalog` holds the validated author/category writes and the read-only
//! listings, `upload` proxies images to object storage, and `health`/`root`
//! report service status.

pub mod catalog;
pub mod health;
pub mod root;
pub mod upload;
