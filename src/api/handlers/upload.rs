//! Image upload and removal, proxied to the configured `ObjectStore`.

use axum::{
    Json,
    extract::{Extension, Multipart, Query, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{info, warn};
use ulid::Ulid;
use utoipa::{IntoParams, ToSchema};

use super::catalog::error::{CatalogError, ErrorBody, query_params};
use crate::media::{ObjectStore, StoredObject};

pub const DEFAULT_BUCKET: &str = "author_photos";
const UPLOAD_FAILED: &str = "Failed to upload image";
const DELETE_FAILED: &str = "Failed to delete image";
/// Request body limit for uploads.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteUploadQuery {
    /// Object name returned by the upload.
    pub path: Option<String>,
    /// Defaults to `author_photos`.
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteUploadResponse {
    pub success: bool,
    pub message: String,
}

/// Multipart form accepted by `POST /api/upload` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(format = Binary)]
    file: String,
    bucket: Option<String>,
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

/// Bucket names: lowercase alphanumerics plus `_` and `-`, 2 to 63 characters.
fn valid_bucket(bucket: &str) -> bool {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{1,62}$").is_ok_and(|re| re.is_match(bucket))
}

/// Object paths are relative and may not climb out of the bucket.
fn valid_object_path(path: &str) -> bool {
    !path.starts_with('/') && !path.split('/').any(|segment| segment == "..")
}

/// Extension for a stored object: the file name's extension when it is short
/// and alphanumeric, otherwise the content subtype (`image/svg+xml` gives `svg`).
fn extension_for(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });

    from_name.unwrap_or_else(|| {
        content_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or_default()
            .split(['+', ';'])
            .next()
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("bin")
            .to_ascii_lowercase()
    })
}

/// `{unix_millis}-{ulid}.{ext}`, unique without coordination.
fn object_name(file_name: Option<&str>, content_type: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!(
        "{millis}-{}.{}",
        Ulid::new().to_string().to_lowercase(),
        extension_for(file_name, content_type)
    )
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored.", body = StoredObject),
        (status = 400, description = "Missing file, non-image content or invalid bucket.", body = ErrorBody),
        (status = 500, description = "Object storage failure.", body = ErrorBody),
    ),
    tag = "upload"
)]
/// Stores an image in object storage and returns its public URL.
pub async fn upload_image(
    store: Extension<Arc<dyn ObjectStore>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut file: Option<UploadedFile> = None;
    let mut bucket: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return reject(err.status(), "Invalid multipart body"),
        };

        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(err) => return reject(err.status(), "Invalid multipart body"),
                };
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("bucket") => match field.text().await {
                Ok(text) => bucket = Some(text.trim().to_string()).filter(|b| !b.is_empty()),
                Err(err) => return reject(err.status(), "Invalid multipart body"),
            },
            _ => {}
        }
    }

    let Some(file) = file else {
        return reject(StatusCode::BAD_REQUEST, "No file provided");
    };
    if !file.content_type.starts_with("image/") {
        return reject(StatusCode::BAD_REQUEST, "File must be an image");
    }
    let bucket = bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string());
    if !valid_bucket(&bucket) {
        return reject(StatusCode::BAD_REQUEST, "Invalid bucket name");
    }

    let path = object_name(file.file_name.as_deref(), &file.content_type);
    match store
        .upload(&bucket, &path, &file.content_type, file.bytes)
        .await
    {
        Ok(stored) => {
            info!(bucket = %stored.bucket, path = %stored.path, "Image uploaded");
            (StatusCode::OK, Json(stored)).into_response()
        }
        Err(err) => {
            warn!(bucket = %bucket, path = %path, "Object storage upload failed: {err}");
            CatalogError::Unexpected(UPLOAD_FAILED).into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/upload",
    params(DeleteUploadQuery),
    responses(
        (status = 200, description = "Image removed.", body = DeleteUploadResponse),
        (status = 400, description = "Missing or invalid path or bucket.", body = ErrorBody),
        (status = 500, description = "Object storage failure.", body = ErrorBody),
    ),
    tag = "upload"
)]
/// Removes a previously uploaded image.
pub async fn delete_image(
    store: Extension<Arc<dyn ObjectStore>>,
    query: Result<Query<DeleteUploadQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(err) => return err.into_response(),
    };
    let Some(path) = query
        .path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
    else {
        return reject(StatusCode::BAD_REQUEST, "No file path provided");
    };
    if !valid_object_path(path) {
        return reject(StatusCode::BAD_REQUEST, "Invalid file path");
    }
    let bucket = query
        .bucket
        .as_deref()
        .map(str::trim)
        .filter(|bucket| !bucket.is_empty())
        .unwrap_or(DEFAULT_BUCKET);
    if !valid_bucket(bucket) {
        return reject(StatusCode::BAD_REQUEST, "Invalid bucket name");
    }

    match store.remove(bucket, path).await {
        Ok(()) => {
            info!(bucket, path, "Image deleted");
            (
                StatusCode::OK,
                Json(DeleteUploadResponse {
                    success: true,
                    message: "Image deleted successfully".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => {
            warn!(bucket, path, "Object storage delete failed: {err}");
            CatalogError::Unexpected(DELETE_FAILED).into_response()
        }
    }
}
