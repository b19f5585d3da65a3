//! Offline-first progress store.
//!
//! Every mutation is applied to the local snapshot first. When an account is
//! signed in, a push of the latest snapshot is started in the background;
//! its failure is logged and never reaches the caller. Mutations and login
//! merges are serialized behind one async lock.

use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use wortschatz_core::algorithm::{sm2::Sm2, Scheduler};
use wortschatz_core::migration::{build_key_map, migrate_snapshot, MigrationReport};
use wortschatz_core::queue::due_queue;
use wortschatz_core::types::{
    AccountSnapshot, DeckSummary, Grade, LessonProgress, ReviewState, RewardOutcome,
    VocabularyItem,
};
use wortschatz_core::VocabError;

use crate::db::{
    DbError, LocalRepository, MigrationRepository, ProgressRepository, SharedRepository,
};
use crate::remote::DocumentStore;
use crate::sync::{FallbackReason, MergeOutcome, SnapshotSource, SyncMerger, SyncStatus};

/// Errors surfaced by the progress store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] VocabError),

    #[error("local storage error: {0}")]
    Local(#[from] DbError),

    #[error("progress store is not ready: call init() first, or it was disposed")]
    NotReady,

    #[error("account {0} is signed in; sign out before switching accounts")]
    AccountInUse(String),
}

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Ready,
    Disposed,
}

struct Session {
    lifecycle: Lifecycle,
    account_id: Option<String>,
}

impl Session {
    fn ensure_ready(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Created | Lifecycle::Disposed => Err(StoreError::NotReady),
        }
    }
}

struct StoreInner<R> {
    repo: SharedRepository,
    merger: SyncMerger<R>,
    scheduler: Box<dyn Scheduler>,
    session: Mutex<Session>,
    background: StdMutex<Vec<JoinHandle<()>>>,
}

/// Progress of the learner on this device.
///
/// Cloning is cheap; all clones share the same state and lock.
pub struct ProgressStore<R> {
    inner: Arc<StoreInner<R>>,
}

impl<R> Clone for ProgressStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: DocumentStore> ProgressStore<R> {
    /// Create a store using the default SM-2 scheduler.
    pub fn new(merger: SyncMerger<R>) -> Self {
        Self::with_scheduler(merger, Box::new(Sm2::default()))
    }

    pub fn with_scheduler(merger: SyncMerger<R>, scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                repo: merger.repository().clone(),
                merger,
                scheduler,
                session: Mutex::new(Session {
                    lifecycle: Lifecycle::Created,
                    account_id: None,
                }),
                background: StdMutex::new(Vec::new()),
            }),
        }
    }

    /// Open the store for use, checking that local progress is readable.
    pub async fn init(&self) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        if session.lifecycle == Lifecycle::Disposed {
            return Err(StoreError::NotReady);
        }
        let snapshot = LocalRepository::lock(&self.inner.repo)?.load_snapshot()?;
        session.lifecycle = Lifecycle::Ready;
        tracing::debug!(
            review_states = snapshot.review_states.len(),
            coins = snapshot.account.coins,
            "progress store ready"
        );
        Ok(())
    }

    /// Wait for background pushes and refuse further calls.
    pub async fn dispose(&self) {
        self.inner.session.lock().await.lifecycle = Lifecycle::Disposed;
        self.settle().await;
    }

    /// Wait until all background pushes started so far have finished.
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = match self.inner.background.lock() {
            Ok(mut background) => background.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background push task failed");
            }
        }
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.inner.merger.status().await
    }

    pub async fn account_id(&self) -> Option<String> {
        self.inner.session.lock().await.account_id.clone()
    }

    /// Sign in and merge the account's cloud progress into local progress.
    ///
    /// When the cloud answered, the merged snapshot is pushed back so both
    /// sides converge. An unreachable cloud leaves the remote untouched.
    ///
    /// Signing in while another account is signed in fails with
    /// [`StoreError::AccountInUse`]; call [`sign_out`](Self::sign_out) first.
    /// The account only counts as signed in once the merge has been saved.
    pub async fn sign_in(&self, account_id: &str) -> Result<MergeOutcome> {
        let mut session = self.ready_session().await?;
        if let Some(current) = session.account_id.as_deref() {
            if current != account_id {
                return Err(StoreError::AccountInUse(current.to_string()));
            }
        }

        let outcome = self.inner.merger.merge_on_login(account_id).await?;
        session.account_id = Some(account_id.to_string());
        let cloud_answered = outcome.source == SnapshotSource::Cloud
            || outcome.fallback == Some(FallbackReason::NotFound);
        if cloud_answered {
            self.schedule_push(&session);
        }
        Ok(outcome)
    }

    /// Forget the account and clear local progress. The cloud copy is kept.
    pub async fn sign_out(&self) -> Result<()> {
        let mut session = self.ready_session().await?;
        // pending pushes read the local snapshot, so they must finish before it is cleared
        self.settle().await;
        LocalRepository::lock(&self.inner.repo)?.clear_progress()?;
        session.account_id = None;
        tracing::info!("signed out, local progress cleared");
        Ok(())
    }

    /// Grade a flashcard review and reschedule the item.
    pub async fn grade_item(&self, item_key: &str, grade: Grade) -> Result<ReviewState> {
        self.grade_item_at(item_key, grade, Utc::now()).await
    }

    pub async fn grade_item_at(
        &self,
        item_key: &str,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        let scheduler = &self.inner.scheduler;
        let state = self
            .mutate(now, |snapshot| {
                let next =
                    scheduler.compute_next_state(snapshot.review_states.get(item_key), grade, now);
                snapshot
                    .review_states
                    .insert(item_key.to_string(), next.clone());
                Ok(next)
            })
            .await?;
        tracing::debug!(
            item_key,
            %grade,
            interval = state.interval,
            repetition = state.repetition,
            "graded item"
        );
        Ok(state)
    }

    /// Add coins and return the new balance.
    pub async fn add_coins(&self, amount: u32) -> Result<u64> {
        self.mutate(Utc::now(), |snapshot| Ok(snapshot.account.add_coins(amount)))
            .await
    }

    /// Add coins once per `reason_id`; repeated calls report `AlreadyClaimed`.
    pub async fn award_coins_once(&self, amount: u32, reason_id: &str) -> Result<RewardOutcome> {
        let outcome = self
            .mutate(Utc::now(), |snapshot| {
                Ok(snapshot.account.award_once(amount, reason_id))
            })
            .await?;
        if outcome == RewardOutcome::AlreadyClaimed {
            tracing::debug!(reason_id, "reward already claimed");
        }
        Ok(outcome)
    }

    /// Record a lesson attempt; returns whether it set a new high score.
    pub async fn record_lesson_stars(&self, lesson_id: &str, stars: u8) -> Result<bool> {
        self.mutate(Utc::now(), |snapshot| {
            let lesson = snapshot
                .lesson_progress
                .entry(lesson_id.to_string())
                .or_default();
            Ok(lesson.record(stars)?)
        })
        .await
    }

    /// Add a word to the learned set; returns false if it was already there.
    pub async fn mark_word_learned(&self, item_key: &str) -> Result<bool> {
        self.mutate(Utc::now(), |snapshot| {
            Ok(snapshot.account.mark_learned(item_key))
        })
        .await
    }

    /// Clear all progress and overwrite the cloud copy with the empty snapshot.
    pub async fn reset_all(&self) -> Result<()> {
        let session = self.ready_session().await?;
        LocalRepository::lock(&self.inner.repo)?.clear_progress()?;
        tracing::info!("progress reset");
        self.schedule_push(&session);
        Ok(())
    }

    /// Move word-keyed progress to stable item ids. Runs once per device.
    pub async fn migrate_item_keys(&self, items: &[VocabularyItem]) -> Result<MigrationReport> {
        let session = self.ready_session().await?;

        let report = {
            let repo = LocalRepository::lock(&self.inner.repo)?;
            if repo.load_key_map()?.is_some() {
                return Ok(MigrationReport::default());
            }

            let key_map = build_key_map(items);
            let mut snapshot = repo.load_snapshot()?;
            let report = migrate_snapshot(&mut snapshot, &key_map);
            if !report.is_empty() {
                snapshot.updated_at = Some(Utc::now());
                repo.save_snapshot(&snapshot)?;
            }
            repo.save_key_map(&key_map)?;
            report
        };

        if !report.is_empty() {
            tracing::info!(
                review_states = report.review_states,
                learned_words = report.learned_words,
                "migrated progress to item ids"
            );
            self.schedule_push(&session);
        }
        Ok(report)
    }

    pub async fn snapshot(&self) -> Result<AccountSnapshot> {
        let _session = self.ready_session().await?;
        Ok(LocalRepository::lock(&self.inner.repo)?.load_snapshot()?)
    }

    pub async fn review_state(&self, item_key: &str) -> Result<Option<ReviewState>> {
        let _session = self.ready_session().await?;
        let mut states = LocalRepository::lock(&self.inner.repo)?.load_review_states()?;
        Ok(states.remove(item_key))
    }

    pub async fn lesson_progress(&self, lesson_id: &str) -> Result<Option<LessonProgress>> {
        let _session = self.ready_session().await?;
        let lessons = LocalRepository::lock(&self.inner.repo)?.load_lessons()?;
        Ok(lessons.get(lesson_id).copied())
    }

    pub async fn coins(&self) -> Result<u64> {
        let _session = self.ready_session().await?;
        Ok(LocalRepository::lock(&self.inner.repo)?.load_account()?.coins)
    }

    /// Keys due for review at `now`, most overdue first.
    pub async fn due_items(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let _session = self.ready_session().await?;
        let states = LocalRepository::lock(&self.inner.repo)?.load_review_states()?;
        Ok(due_queue(&states, now))
    }

    pub async fn deck_summary(
        &self,
        items: &[VocabularyItem],
        now: DateTime<Utc>,
    ) -> Result<DeckSummary> {
        let _session = self.ready_session().await?;
        let states = LocalRepository::lock(&self.inner.repo)?.load_review_states()?;
        Ok(DeckSummary::from_states(items, &states, now))
    }

    async fn ready_session(&self) -> Result<MutexGuard<'_, Session>> {
        let session = self.inner.session.lock().await;
        session.ensure_ready()?;
        Ok(session)
    }

    /// Apply `apply` to the local snapshot under the store lock.
    ///
    /// The snapshot is saved and a push scheduled only when it changed.
    async fn mutate<T, F>(&self, now: DateTime<Utc>, apply: F) -> Result<T>
    where
        F: FnOnce(&mut AccountSnapshot) -> Result<T>,
    {
        let session = self.ready_session().await?;

        let (value, changed) = {
            let repo = LocalRepository::lock(&self.inner.repo)?;
            let mut snapshot = repo.load_snapshot()?;
            let before = snapshot.clone();
            let value = apply(&mut snapshot)?;
            let changed = snapshot != before;
            if changed {
                snapshot.updated_at = Some(now);
                repo.save_snapshot(&snapshot)?;
            }
            (value, changed)
        };

        if changed {
            self.schedule_push(&session);
        }
        Ok(value)
    }

    fn schedule_push(&self, session: &Session) {
        let Some(account_id) = session.account_id.clone() else {
            tracing::debug!("no account signed in, progress stays local");
            return;
        };

        let merger = self.inner.merger.clone();
        let handle = tokio::spawn(async move {
            merger.push_current(&account_id).await;
        });

        if let Ok(mut background) = self.inner.background.lock() {
            background.retain(|task| !task.is_finished());
            background.push(handle);
        }
    }
}
