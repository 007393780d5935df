use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub version: String,
    pub status: String,
}

// axum handler for `/`, not part of the OpenAPI document
pub async fn root() -> impl IntoResponse {
    Json(Banner {
        message: "Punto Lector API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn root_reports_service_banner() -> anyhow::Result<()> {
        let response = root().await.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let banner: Banner = serde_json::from_slice(&body)?;
        assert_eq!(banner.message, "Punto Lector API");
        assert_eq!(banner.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(banner.status, "running");
        Ok(())
    }
}
