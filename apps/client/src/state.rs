//! Application state.

use anyhow::Context;

use crate::config::ClientConfig;
use crate::content::ContentSource;
use crate::db::{LocalRepository, SqliteKeyValueStore};
use crate::progress::ProgressStore;
use crate::remote::HttpDocumentStore;
use crate::sync::SyncMerger;

/// Components wired together for the host application.
pub struct AppState {
    pub progress: ProgressStore<HttpDocumentStore>,
    pub content: ContentSource,
}

impl AppState {
    /// Open local storage and build the remote clients described by `config`.
    ///
    /// The progress store still needs `init()` before use.
    pub fn open(config: &ClientConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }

        let store = SqliteKeyValueStore::open(&config.database_path)
            .with_context(|| format!("opening {}", config.database_path.display()))?;
        let repo = LocalRepository::new(store).shared();

        let remote = HttpDocumentStore::new(&config.remote).context("building document store client")?;
        let content = ContentSource::new(repo.clone(), config.content_url.clone(), config.remote.timeout)
            .context("building content client")?;

        Ok(Self {
            progress: ProgressStore::new(SyncMerger::new(repo, remote)),
            content,
        })
    }
}
