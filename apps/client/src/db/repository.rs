//! Repository pattern for typed access to the key-value store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wortschatz_core::types::{AccountProgress, AccountSnapshot, LessonProgress, ReviewState};

use crate::db::error::DbError;
use crate::db::kv::KeyValueStore;

type Result<T> = std::result::Result<T, DbError>;

const REVIEW_STATES_KEY: &str = "progress.reviewStates";
const LESSONS_KEY: &str = "progress.lessons";
const ACCOUNT_KEY: &str = "progress.account";
const UPDATED_AT_KEY: &str = "progress.updatedAt";
const VOCABULARY_CACHE_KEY: &str = "content.vocabulary";
const KEY_MAP_KEY: &str = "migration.itemKeys";

const PROGRESS_KEYS: [&str; 4] = [REVIEW_STATES_KEY, LESSONS_KEY, ACCOUNT_KEY, UPDATED_AT_KEY];

/// Repository for progress documents.
pub trait ProgressRepository {
    fn load_review_states(&self) -> Result<BTreeMap<String, ReviewState>>;
    fn load_lessons(&self) -> Result<BTreeMap<String, LessonProgress>>;
    fn load_account(&self) -> Result<AccountProgress>;
    fn load_snapshot(&self) -> Result<AccountSnapshot>;
    fn save_snapshot(&self, snapshot: &AccountSnapshot) -> Result<()>;
    fn clear_progress(&self) -> Result<()>;
}

/// Last successful vocabulary download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVocabulary {
    pub payload: String,
    pub sha256: String,
    pub fetched_at: DateTime<Utc>,
}

/// Repository for cached remote content.
pub trait ContentRepository {
    fn load_cached_vocabulary(&self) -> Result<Option<CachedVocabulary>>;
    fn save_cached_vocabulary(&self, cache: &CachedVocabulary) -> Result<()>;
}

/// Repository for the word → item id mapping table.
pub trait MigrationRepository {
    fn load_key_map(&self) -> Result<Option<BTreeMap<String, String>>>;
    fn save_key_map(&self, key_map: &BTreeMap<String, String>) -> Result<()>;
}

/// Typed repositories over any key-value backend.
pub struct LocalRepository {
    store: Box<dyn KeyValueStore>,
}

/// Repository shared between the progress store, sync merger and content source.
pub type SharedRepository = Arc<Mutex<LocalRepository>>;

impl LocalRepository {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Wrap in the shared handle used across components.
    pub fn shared(self) -> SharedRepository {
        Arc::new(Mutex::new(self))
    }

    /// Lock a shared repository, reporting a poisoned lock as unavailable storage.
    pub fn lock(shared: &SharedRepository) -> Result<MutexGuard<'_, LocalRepository>> {
        shared
            .lock()
            .map_err(|_| DbError::Unavailable("repository lock poisoned".to_string()))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, &serde_json::to_string(value)?)
    }
}

impl ProgressRepository for LocalRepository {
    fn load_review_states(&self) -> Result<BTreeMap<String, ReviewState>> {
        Ok(self.read(REVIEW_STATES_KEY)?.unwrap_or_default())
    }

    fn load_lessons(&self) -> Result<BTreeMap<String, LessonProgress>> {
        Ok(self.read(LESSONS_KEY)?.unwrap_or_default())
    }

    fn load_account(&self) -> Result<AccountProgress> {
        Ok(self.read(ACCOUNT_KEY)?.unwrap_or_default())
    }

    fn load_snapshot(&self) -> Result<AccountSnapshot> {
        Ok(AccountSnapshot {
            account: self.load_account()?,
            lesson_progress: self.load_lessons()?,
            review_states: self.load_review_states()?,
            updated_at: self.read::<Option<DateTime<Utc>>>(UPDATED_AT_KEY)?.flatten(),
        })
    }

    fn save_snapshot(&self, snapshot: &AccountSnapshot) -> Result<()> {
        let entries = [
            (
                REVIEW_STATES_KEY,
                serde_json::to_string(&snapshot.review_states)?,
            ),
            (LESSONS_KEY, serde_json::to_string(&snapshot.lesson_progress)?),
            (ACCOUNT_KEY, serde_json::to_string(&snapshot.account)?),
            (UPDATED_AT_KEY, serde_json::to_string(&snapshot.updated_at)?),
        ];
        self.store.set_many(&entries)?;
        tracing::debug!(
            review_states = snapshot.review_states.len(),
            lessons = snapshot.lesson_progress.len(),
            coins = snapshot.account.coins,
            "saved local snapshot"
        );
        Ok(())
    }

    fn clear_progress(&self) -> Result<()> {
        self.store.remove_many(&PROGRESS_KEYS)
    }
}

impl ContentRepository for LocalRepository {
    fn load_cached_vocabulary(&self) -> Result<Option<CachedVocabulary>> {
        self.read(VOCABULARY_CACHE_KEY)
    }

    fn save_cached_vocabulary(&self, cache: &CachedVocabulary) -> Result<()> {
        self.write(VOCABULARY_CACHE_KEY, cache)
    }
}

impl MigrationRepository for LocalRepository {
    fn load_key_map(&self) -> Result<Option<BTreeMap<String, String>>> {
        self.read(KEY_MAP_KEY)
    }

    fn save_key_map(&self, key_map: &BTreeMap<String, String>) -> Result<()> {
        self.write(KEY_MAP_KEY, key_map)
    }
}
