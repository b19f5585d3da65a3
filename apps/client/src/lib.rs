//! Device-side runtime for vocabulary progress.
//!
//! Provides:
//! - Offline-first progress store (reviews, lesson stars, coins, learned words)
//! - Sync merger reconciling local progress with a per-account cloud document
//! - Vocabulary content download with a local cache
//! - SQLite-backed key-value persistence

pub mod config;
pub mod content;
pub mod db;
pub mod progress;
pub mod remote;
pub mod state;
pub mod sync;

pub use config::{ClientConfig, ConfigError, RemoteConfig};
pub use content::{ContentError, ContentOrigin, ContentSource, Vocabulary};
pub use progress::{ProgressStore, StoreError};
pub use remote::{DocumentStore, HttpDocumentStore, RemoteError};
pub use state::AppState;
pub use sync::{
    FallbackReason, MergeOutcome, PullState, PushResult, PushState, SnapshotSource, SyncMerger,
    SyncStatus,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
