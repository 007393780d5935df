use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_STORAGE_URL: &str = "storage-url";
pub const ARG_STORAGE_KEY: &str = "storage-key";

/// Object storage settings. Uploads are disabled when `url` is unset.
#[derive(Debug, Clone)]
pub struct Options {
    pub url: Option<String>,
    pub key: Option<SecretString>,
}

impl Options {
    /// Parse storage arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a storage URL is given without a key.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = read(ARG_STORAGE_URL);
        let key = read(ARG_STORAGE_KEY).map(SecretString::from);

        if url.is_some() && key.is_none() {
            return Err(anyhow!(
                "missing required argument: --{ARG_STORAGE_KEY} (required with --{ARG_STORAGE_URL})"
            ));
        }

        Ok(Self { url, key })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORAGE_URL)
                .long(ARG_STORAGE_URL)
                .help("Object storage base URL, example: https://<project>.supabase.co")
                .long_help(
                    "Object storage base URL. When unset, image upload and delete fail and the rest of the API keeps working.",
                )
                .env("PUNTOLECTOR_STORAGE_URL"),
        )
        .arg(
            Arg::new(ARG_STORAGE_KEY)
                .long(ARG_STORAGE_KEY)
                .help("Object storage service key")
                .env("PUNTOLECTOR_STORAGE_KEY")
                .hide_env_values(true),
        )
}
