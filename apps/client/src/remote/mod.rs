//! Remote per-account document store.

pub mod http;

use std::future::Future;

use wortschatz_core::types::{AccountSnapshot, SnapshotPatch};

pub use http::HttpDocumentStore;

/// Remote errors. Never fatal: callers fold them into a degraded result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One document per account, addressed by the account id.
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch the account document; `Ok(None)` when it does not exist yet.
    fn get_document(
        &self,
        account_id: &str,
    ) -> impl Future<Output = Result<Option<SnapshotPatch>, RemoteError>> + Send;

    /// Create the account document. Fails if it already exists.
    fn create_document(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Replace an existing document; `RemoteError::NotFound` if there is none.
    fn update_document(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
