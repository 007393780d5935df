//! Maps parsed command-line arguments to the action the binary executes.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{
    ARG_CORS_ORIGIN, ARG_DB_MAX_CONNECTIONS, ARG_DSN, ARG_PORT, storage,
};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3001);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_max_connections = matches
        .get_one::<u32>(ARG_DB_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);
    let cors_origin = matches
        .get_one::<String>(ARG_CORS_ORIGIN)
        .cloned()
        .unwrap_or_else(|| "*".to_string());

    let storage = storage::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        db_max_connections,
        cors_origin,
        storage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("PUNTOLECTOR_DSN", Some("postgres://localhost:5432/puntolector")),
                ("PUNTOLECTOR_PORT", None),
                ("PUNTOLECTOR_CORS_ORIGIN", None),
                ("PUNTOLECTOR_STORAGE_URL", Some("https://abc.supabase.co")),
                ("PUNTOLECTOR_STORAGE_KEY", Some("service-key")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["puntolector"]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected a server action");
                };
                assert_eq!(args.port, 3001);
                assert_eq!(args.dsn, "postgres://localhost:5432/puntolector");
                assert_eq!(args.cors_origin, "*");
                assert_eq!(
                    args.storage.url.as_deref(),
                    Some("https://abc.supabase.co")
                );
                assert_eq!(
                    args.storage.key.as_ref().map(|k| k.expose_secret().to_string()),
                    Some("service-key".to_string())
                );
            },
        );
    }

    #[test]
    fn storage_url_without_key_fails() {
        temp_env::with_vars(
            [
                ("PUNTOLECTOR_DSN", Some("postgres://localhost:5432/puntolector")),
                ("PUNTOLECTOR_STORAGE_URL", Some("https://abc.supabase.co")),
                ("PUNTOLECTOR_STORAGE_KEY", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["puntolector"]);
                assert!(handler(&matches).is_err());
            },
        );
    }
}
