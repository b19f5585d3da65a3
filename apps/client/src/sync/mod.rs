//! Sync merger for cloud progress documents.
//!
//! Pulls happen on login and merge the cloud copy into the local snapshot.
//! Pushes happen after every local mutation and replace the cloud copy with
//! the full local snapshot. Remote failures are logged and reported in the
//! returned outcome; only local storage errors reach the caller.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use wortschatz_core::merge::merge_snapshots;
use wortschatz_core::types::AccountSnapshot;

use crate::db::{DbError, LocalRepository, ProgressRepository, SharedRepository};
use crate::remote::{DocumentStore, RemoteError};

/// Sync errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error("remote pull failed: {0}")]
    Pull(#[source] RemoteError),

    #[error("remote push failed: {0}")]
    Push(#[source] RemoteError),
}

/// Where a login merge took its result from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Cloud,
    Local,
}

/// Why a login merge fell back to the local snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The account has no cloud document yet.
    NotFound,
    /// The cloud could not be reached or answered with an error.
    Unreachable { error: String },
}

/// Result of a login merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub snapshot: AccountSnapshot,
    pub source: SnapshotSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
}

/// Which sides a push reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub local: bool,
    pub cloud: bool,
}

/// How a successful cloud write was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteWrite {
    Updated,
    Created,
}

/// Pull side of the sync state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PullState {
    Idle,
    Pulling,
    Merged,
    LocalFallback { reason: FallbackReason },
}

/// Push side of the sync state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PushState {
    Idle,
    Pushing,
    Pushed,
    PushFailedLocalOk { error: String },
}

/// Sync status for UI. Terminal states stay until the next run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub pull: PullState,
    pub push: PushState,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            pull: PullState::Idle,
            push: PushState::Idle,
        }
    }
}

impl SyncStatus {
    /// No pull or push is running right now.
    pub fn is_idle(&self) -> bool {
        !matches!(self.pull, PullState::Pulling) && !matches!(self.push, PushState::Pushing)
    }
}

/// Inner state shared across clones.
struct SyncMergerInner<R> {
    repo: SharedRepository,
    remote: R,
    status: Mutex<SyncStatus>,
    /// Serializes cloud writes so an older snapshot never lands after a newer one.
    push_lock: Mutex<()>,
}

/// Reconciles the local snapshot with the account's cloud document.
///
/// Cloning is cheap; all clones share the same state.
pub struct SyncMerger<R> {
    inner: Arc<SyncMergerInner<R>>,
}

impl<R> Clone for SyncMerger<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: DocumentStore> SyncMerger<R> {
    /// Create a new sync merger.
    pub fn new(repo: SharedRepository, remote: R) -> Self {
        Self {
            inner: Arc::new(SyncMergerInner {
                repo,
                remote,
                status: Mutex::new(SyncStatus::default()),
                push_lock: Mutex::new(()),
            }),
        }
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.inner.repo
    }

    /// Get current sync status.
    pub async fn status(&self) -> SyncStatus {
        self.inner.status.lock().await.clone()
    }

    /// Pull the cloud document and merge it into the local snapshot.
    ///
    /// The merged snapshot is written back locally. When the cloud has no
    /// document or cannot be reached the local snapshot is returned as is,
    /// tagged with [`SnapshotSource::Local`].
    pub async fn merge_on_login(&self, account_id: &str) -> Result<MergeOutcome, DbError> {
        let local = LocalRepository::lock(&self.inner.repo)?.load_snapshot()?;
        self.set_pull(PullState::Pulling).await;

        let remote = match self.inner.remote.get_document(account_id).await {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                tracing::info!(account_id, "no cloud progress yet, using local snapshot");
                return Ok(self.fall_back(local, FallbackReason::NotFound).await);
            }
            Err(e) => {
                let error = SyncError::Pull(e);
                tracing::warn!(account_id, error = %error, "using local snapshot");
                let reason = FallbackReason::Unreachable {
                    error: error.to_string(),
                };
                return Ok(self.fall_back(local, reason).await);
            }
        };

        let merged = merge_snapshots(&local, &remote);
        let saved = LocalRepository::lock(&self.inner.repo).and_then(|repo| repo.save_snapshot(&merged));
        if let Err(e) = saved {
            self.set_pull(PullState::Idle).await;
            return Err(e);
        }

        tracing::info!(
            account_id,
            coins = merged.account.coins,
            modules = merged.account.completed_modules.len(),
            review_states = merged.review_states.len(),
            "merged cloud progress"
        );
        self.set_pull(PullState::Merged).await;

        Ok(MergeOutcome {
            snapshot: merged,
            source: SnapshotSource::Cloud,
            fallback: None,
        })
    }

    /// Write `snapshot` locally, then to the cloud.
    ///
    /// The cloud document is updated, or created if it does not exist yet.
    pub async fn push_snapshot(&self, account_id: &str, snapshot: &AccountSnapshot) -> PushResult {
        // local and cloud writes of concurrent pushes land in the same order
        let _guard = self.inner.push_lock.lock().await;

        let local = match LocalRepository::lock(&self.inner.repo)
            .and_then(|repo| repo.save_snapshot(snapshot))
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(account_id, error = %e, "failed to save snapshot locally");
                false
            }
        };

        let cloud = self.upload(account_id, snapshot).await;

        PushResult { local, cloud }
    }

    /// Push whatever the local snapshot holds at the time the push runs.
    ///
    /// Returns whether the cloud write succeeded.
    pub async fn push_current(&self, account_id: &str) -> bool {
        let _guard = self.inner.push_lock.lock().await;

        let loaded = LocalRepository::lock(&self.inner.repo).and_then(|repo| repo.load_snapshot());
        let snapshot = match loaded {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(account_id, error = %e, "failed to read local snapshot for push");
                return false;
            }
        };

        self.upload(account_id, &snapshot).await
    }

    async fn upload(&self, account_id: &str, snapshot: &AccountSnapshot) -> bool {
        self.set_push(PushState::Pushing).await;

        match self.upsert_remote(account_id, snapshot).await {
            Ok(write) => {
                tracing::info!(account_id, ?write, "pushed snapshot to cloud");
                self.set_push(PushState::Pushed).await;
                true
            }
            Err(e) => {
                tracing::warn!(account_id, error = %e, "cloud push failed, will retry on next change");
                self.set_push(PushState::PushFailedLocalOk {
                    error: e.to_string(),
                })
                .await;
                false
            }
        }
    }

    async fn upsert_remote(
        &self,
        account_id: &str,
        snapshot: &AccountSnapshot,
    ) -> Result<RemoteWrite, SyncError> {
        match self.inner.remote.update_document(account_id, snapshot).await {
            Ok(()) => Ok(RemoteWrite::Updated),
            Err(RemoteError::NotFound(_)) => {
                self.inner
                    .remote
                    .create_document(account_id, snapshot)
                    .await
                    .map_err(SyncError::Push)?;
                Ok(RemoteWrite::Created)
            }
            Err(e) => Err(SyncError::Push(e)),
        }
    }

    async fn fall_back(&self, local: AccountSnapshot, reason: FallbackReason) -> MergeOutcome {
        self.set_pull(PullState::LocalFallback {
            reason: reason.clone(),
        })
        .await;
        MergeOutcome {
            snapshot: local,
            source: SnapshotSource::Local,
            fallback: Some(reason),
        }
    }

    async fn set_pull(&self, state: PullState) {
        self.inner.status.lock().await.pull = state;
    }

    async fn set_push(&self, state: PushState) {
        self.inner.status.lock().await.push = state;
    }
}
