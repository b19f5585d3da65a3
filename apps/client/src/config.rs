//! Client configuration.
//!
//! The host application builds a [`ClientConfig`] and passes it in. For
//! command-line tools and tests it can also be read from the environment
//! (and a `.env` file):
//!
//! - `WORTSCHATZ_DB_PATH`: local database file (default under the user data dir)
//! - `WORTSCHATZ_CONTENT_URL`: vocabulary JSON endpoint (required)
//! - `WORTSCHATZ_HTTP_TIMEOUT_SECS`: timeout for remote calls (default 10)
//! - `APPWRITE_ENDPOINT`: document store API root
//! - `APPWRITE_PROJECT_ID`: project id (required)
//! - `APPWRITE_DATABASE_ID`, `APPWRITE_COLLECTION_ID`: where progress documents live
//! - `APPWRITE_API_KEY`: optional server key

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_DATABASE_ID: &str = "wortschatz";
pub const DEFAULT_COLLECTION_ID: &str = "user_progress";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration value {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Location and credentials of the remote document store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Everything the client runtime needs from its host.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub database_path: PathBuf,
    pub content_url: String,
    pub remote: RemoteConfig,
}

impl ClientConfig {
    /// Read configuration from process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let timeout_secs = match var("WORTSCHATZ_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "WORTSCHATZ_HTTP_TIMEOUT_SECS",
                value: raw.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            database_path: var("WORTSCHATZ_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            content_url: var("WORTSCHATZ_CONTENT_URL")
                .ok_or(ConfigError::Missing("WORTSCHATZ_CONTENT_URL"))?,
            remote: RemoteConfig {
                endpoint: var("APPWRITE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                project_id: var("APPWRITE_PROJECT_ID")
                    .ok_or(ConfigError::Missing("APPWRITE_PROJECT_ID"))?,
                database_id: var("APPWRITE_DATABASE_ID")
                    .unwrap_or_else(|| DEFAULT_DATABASE_ID.to_string()),
                collection_id: var("APPWRITE_COLLECTION_ID")
                    .unwrap_or_else(|| DEFAULT_COLLECTION_ID.to_string()),
                api_key: var("APPWRITE_API_KEY"),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

/// Default database location in the platform data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wortschatz")
        .join("progress.db")
}
