use super::handlers::{
    catalog::{authors, categories, reference},
    health, upload,
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
/// Routes added outside (like `/` or `OPTIONS /health`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // Handlers sharing a path go into one `routes!` so their methods merge on that path.
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(
            authors::list_authors,
            authors::create_author,
            authors::update_author_handler,
            authors::delete_author_handler
        ))
        .routes(routes!(
            categories::list_categories,
            categories::create_category,
            categories::update_category_handler,
            categories::delete_category_handler
        ))
        .routes(routes!(categories::category_tree))
        .routes(routes!(reference::list_nationalities))
        .routes(routes!(reference::list_books))
        .routes(routes!(reference::list_stores))
        .routes(routes!(reference::list_listings))
        .routes(routes!(upload::upload_image, upload::delete_image))
}

fn catalog_tags() -> Vec<Tag> {
    vec![
        tag("authors", "Author administration"),
        tag("categories", "Category hierarchy administration"),
        tag("reference", "Read-only catalog data"),
        tag("upload", "Image storage"),
        tag("health", "Service status"),
    ]
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(catalog_tags()))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Punto Lector"));
            assert_eq!(contact.email.as_deref(), Some("team@puntolector.app"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_documents_catalog_routes() {
        let doc = openapi();
        for path in [
            "/health",
            "/api/authors",
            "/api/categories",
            "/api/categories/tree",
            "/api/nationalities",
            "/api/books",
            "/api/stores",
            "/api/listings",
            "/api/upload",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let authors = &doc.paths.paths["/api/authors"];
        assert!(authors.get.is_some());
        assert!(authors.post.is_some());
        assert!(authors.put.is_some());
        assert!(authors.delete.is_some());

        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "categories"));
    }

    #[test]
    fn author_parsing() {
        assert_eq!(
            parse_author("Team Punto Lector <team@puntolector.app>"),
            (Some("Team Punto Lector"), Some("team@puntolector.app"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<only@mail>"), (None, Some("only@mail")));
    }
}
