//! Object storage for catalog images.
//!
//! `ObjectStore` is the seam the upload handlers talk to. Production uses
//! `SupabaseStore`, a thin client over the Supabase Storage REST API; when no
//! storage URL is configured the server runs with `DisabledStore` and uploads
//! fail with a `500`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

use crate::APP_USER_AGENT;

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredObject {
    /// Public URL of the object.
    pub url: String,
    /// Object name inside the bucket.
    pub path: String,
    pub bucket: String,
}

#[derive(Debug)]
pub enum MediaError {
    /// No storage backend is configured.
    Disabled,
    InvalidUrl(url::ParseError),
    Request(reqwest::Error),
    /// The storage API answered with a non-success status.
    Rejected { status: StatusCode, message: String },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "object storage is not configured"),
            Self::InvalidUrl(err) => write!(f, "invalid storage URL: {err}"),
            Self::Request(err) => write!(f, "storage request failed: {err}"),
            Self::Rejected { status, message } => {
                write!(f, "storage rejected the request ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidUrl(err) => Some(err),
            Self::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<url::ParseError> for MediaError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err)
    }
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err)
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `bucket/path` without overwriting an existing object.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, MediaError>;

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), MediaError>;
}

/// Supabase Storage client authenticated with a service key.
pub struct SupabaseStore {
    client: Client,
    base: Url,
    key: SecretString,
}

impl fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseStore {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, key: SecretString) -> Result<Self, MediaError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self { client, base, key })
    }

    fn object_url(&self, bucket: &str, path: &str) -> Result<Url, MediaError> {
        Ok(self
            .base
            .join(&format!("storage/v1/object/{bucket}/{path}"))?)
    }

    fn bucket_url(&self, bucket: &str) -> Result<Url, MediaError> {
        Ok(self.base.join(&format!("storage/v1/object/{bucket}"))?)
    }

    /// Public URL of an object in a public bucket.
    ///
    /// # Errors
    /// Returns an error if the bucket or path cannot form a valid URL.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<Url, MediaError> {
        Ok(self
            .base
            .join(&format!("storage/v1/object/public/{bucket}/{path}"))?)
    }

    async fn rejected(response: reqwest::Response) -> MediaError {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        MediaError::Rejected { status, message }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, MediaError> {
        let url = self.object_url(bucket, path)?;
        debug!("uploading object to {url}");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.key.expose_secret())
            .header("apikey", self.key.expose_secret())
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        Ok(StoredObject {
            url: self.public_url(bucket, path)?.to_string(),
            path: path.to_string(),
            bucket: bucket.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn remove(&self, bucket: &str, path: &str) -> Result<(), MediaError> {
        let response = self
            .client
            .delete(self.bucket_url(bucket)?)
            .bearer_auth(self.key.expose_secret())
            .header("apikey", self.key.expose_secret())
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}

/// Store used when uploads are not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

#[async_trait]
impl ObjectStore for DisabledStore {
    async fn upload(
        &self,
        _bucket: &str,
        _path: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<StoredObject, MediaError> {
        Err(MediaError::Disabled)
    }

    async fn remove(&self, _bucket: &str, _path: &str) -> Result<(), MediaError> {
        Err(MediaError::Disabled)
    }
}
