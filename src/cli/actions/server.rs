use crate::{
    api,
    cli::commands::storage,
    media::{DisabledStore, ObjectStore, SupabaseStore},
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
    pub cors_origin: String,
    pub storage: storage::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database pool or storage client cannot be built, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = PgPoolOptions::new()
        .max_connections(args.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let store = object_store(&args.storage)?;

    api::new(args.port, pool, store, &args.cors_origin).await
}

fn object_store(options: &storage::Options) -> Result<Arc<dyn ObjectStore>> {
    match (&options.url, &options.key) {
        (Some(url), Some(key)) => {
            let store = SupabaseStore::new(url, key.clone())
                .with_context(|| format!("Invalid storage URL: {url}"))?;
            Ok(Arc::new(store))
        }
        _ => {
            info!("Object storage not configured, image uploads are disabled");
            Ok(Arc::new(DisabledStore))
        }
    }
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("db_max_connections", args.db_max_connections.to_string()),
        ("cors_origin", args.cors_origin.clone()),
        (
            "storage_url",
            args.storage
                .url
                .clone()
                .unwrap_or_else(|| "disabled".to_string()),
        ),
        ("storage_key_set", args.storage.key.is_some().to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} - {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
