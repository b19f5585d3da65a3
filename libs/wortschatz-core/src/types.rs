//! Core types for vocabulary progress.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VocabError};

/// Highest star rating a lesson attempt can earn.
pub const MAX_STARS: u8 = 3;

/// Recall quality reported by the learner for a flashcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Forgot the word.
    Again,
    /// Recalled with difficulty.
    Hard,
    /// Recalled easily.
    Good,
}

impl Grade {
    /// Get the grade name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
        }
    }
}

impl FromStr for Grade {
    type Err = VocabError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            other => Err(VocabError::InvalidGrade(other.to_string())),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spaced repetition state of one vocabulary item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Days until the next review, at least 1.
    pub interval: u32,
    /// Consecutive reviews not graded "again".
    pub repetition: u32,
    /// Read but never adjusted by the scheduler.
    pub easiness_factor: f64,
    pub next_review_date: DateTime<Utc>,
}

impl ReviewState {
    pub const DEFAULT_EASINESS: f64 = 2.5;

    /// State of an item that has never been graded.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            interval: 1,
            repetition: 0,
            easiness_factor: Self::DEFAULT_EASINESS,
            next_review_date: now,
        }
    }

    /// An item is due once its review date has been reached.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    /// Derived from `interval` on every call.
    pub fn is_mastered(&self) -> bool {
        self.interval > 1
    }
}

/// Best result achieved for a lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub stars: u8,
    pub completed: bool,
}

impl LessonProgress {
    /// Record an attempt and report whether it is a new high score.
    ///
    /// Stars are only ever raised; a lower or equal attempt leaves them as is.
    pub fn record(&mut self, stars: u8) -> Result<bool> {
        if stars > MAX_STARS {
            return Err(VocabError::InvalidStarCount(stars));
        }

        let is_new_high_score = stars > self.stars;
        if is_new_high_score {
            self.stars = stars;
        }
        if stars > 0 {
            self.completed = true;
        }
        Ok(is_new_high_score)
    }
}

/// Outcome of a one-time coin reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardOutcome {
    Awarded { coins: u64 },
    AlreadyClaimed,
}

/// Account-wide progress counters and sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProgress {
    pub coins: u64,
    pub learned_words: BTreeSet<String>,
    pub completed_modules: BTreeSet<String>,
    pub total_score: u64,
    pub level: u32,
    pub achievements: BTreeSet<String>,
    pub rewards_claimed: BTreeSet<String>,
}

impl Default for AccountProgress {
    fn default() -> Self {
        Self {
            coins: 0,
            learned_words: BTreeSet::new(),
            completed_modules: BTreeSet::new(),
            total_score: 0,
            level: 1,
            achievements: BTreeSet::new(),
            rewards_claimed: BTreeSet::new(),
        }
    }
}

impl AccountProgress {
    /// Add coins and return the new balance.
    pub fn add_coins(&mut self, amount: u32) -> u64 {
        self.coins = self.coins.saturating_add(u64::from(amount));
        self.coins
    }

    /// Add coins unless `reason_id` has already been rewarded.
    pub fn award_once(&mut self, amount: u32, reason_id: &str) -> RewardOutcome {
        if self.rewards_claimed.contains(reason_id) {
            return RewardOutcome::AlreadyClaimed;
        }
        self.rewards_claimed.insert(reason_id.to_string());
        RewardOutcome::Awarded {
            coins: self.add_coins(amount),
        }
    }

    /// Returns false when the word was already learned.
    pub fn mark_learned(&mut self, item_key: &str) -> bool {
        if self.learned_words.contains(item_key) {
            return false;
        }
        self.learned_words.insert(item_key.to_string())
    }
}

/// Complete progress document of one account.
///
/// Stored locally and pushed to the cloud as a single unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    #[serde(flatten)]
    pub account: AccountProgress,
    #[serde(default)]
    pub lesson_progress: BTreeMap<String, LessonProgress>,
    #[serde(default)]
    pub review_states: BTreeMap<String, ReviewState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Remote view of a snapshot; absent fields leave the local value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learned_words: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_modules: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievements: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards_claimed: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_progress: Option<BTreeMap<String, LessonProgress>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_states: Option<BTreeMap<String, ReviewState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&AccountSnapshot> for SnapshotPatch {
    fn from(snapshot: &AccountSnapshot) -> Self {
        let account = &snapshot.account;
        Self {
            coins: Some(account.coins),
            learned_words: Some(account.learned_words.clone()),
            completed_modules: Some(account.completed_modules.clone()),
            total_score: Some(account.total_score),
            level: Some(account.level),
            achievements: Some(account.achievements.clone()),
            rewards_claimed: Some(account.rewards_claimed.clone()),
            lesson_progress: Some(snapshot.lesson_progress.clone()),
            review_states: Some(snapshot.review_states.clone()),
            updated_at: snapshot.updated_at,
        }
    }
}

/// Vocabulary entry delivered by the content service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub word: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl VocabularyItem {
    /// Key under which progress for this item is stored.
    ///
    /// Items without a stable id fall back to their surface word.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.word)
    }
}

/// Counts shown on a vocabulary deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeckSummary {
    pub total: usize,
    pub new: usize,
    pub due: usize,
    pub mastered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn grade_parses_known_names() {
        assert_eq!("again".parse::<Grade>(), Ok(Grade::Again));
        assert_eq!("hard".parse::<Grade>(), Ok(Grade::Hard));
        assert_eq!("good".parse::<Grade>(), Ok(Grade::Good));
    }

    #[test]
    fn grade_rejects_unknown_name() {
        assert_eq!(
            "easy".parse::<Grade>(),
            Err(VocabError::InvalidGrade("easy".to_string()))
        );
        assert!("Good".parse::<Grade>().is_err());
    }

    #[test]
    fn grade_deserialize_rejects_unknown() {
        assert!(serde_json::from_str::<Grade>("\"perfect\"").is_err());
        assert_eq!(serde_json::from_str::<Grade>("\"hard\"").unwrap(), Grade::Hard);
    }

    #[test]
    fn new_review_state_is_due_immediately() {
        let state = ReviewState::new(now());
        assert_eq!(state.interval, 1);
        assert_eq!(state.repetition, 0);
        assert_eq!(state.easiness_factor, 2.5);
        assert!(state.is_due(now()));
        assert!(!state.is_mastered());
    }

    #[test]
    fn lesson_keeps_high_score() {
        let mut lesson = LessonProgress::default();
        assert_eq!(lesson.record(2), Ok(true));
        assert_eq!(lesson.record(1), Ok(false));
        assert_eq!(lesson.stars, 2);
        assert!(lesson.completed);
    }

    #[test]
    fn lesson_equal_score_is_not_new_high() {
        let mut lesson = LessonProgress::default();
        lesson.record(3).unwrap();
        assert_eq!(lesson.record(3), Ok(false));
    }

    #[test]
    fn lesson_zero_stars_does_not_complete() {
        let mut lesson = LessonProgress::default();
        assert_eq!(lesson.record(0), Ok(false));
        assert!(!lesson.completed);
    }

    #[test]
    fn lesson_rejects_more_than_three_stars() {
        let mut lesson = LessonProgress::default();
        assert_eq!(lesson.record(4), Err(VocabError::InvalidStarCount(4)));
        assert_eq!(lesson, LessonProgress::default());
    }

    #[test]
    fn award_once_is_idempotent() {
        let mut account = AccountProgress::default();
        assert_eq!(
            account.award_once(10, "lesson_x_complete"),
            RewardOutcome::Awarded { coins: 10 }
        );
        assert_eq!(
            account.award_once(10, "lesson_x_complete"),
            RewardOutcome::AlreadyClaimed
        );
        assert_eq!(account.coins, 10);
    }

    #[test]
    fn mark_learned_reports_new_members_only() {
        let mut account = AccountProgress::default();
        assert!(account.mark_learned("Haus"));
        assert!(!account.mark_learned("Haus"));
        assert_eq!(account.learned_words.len(), 1);
    }

    #[test]
    fn snapshot_json_reads_back_as_full_patch() {
        let mut snapshot = AccountSnapshot::default();
        snapshot.account.coins = 42;
        snapshot.account.completed_modules.insert("a1".to_string());
        snapshot
            .review_states
            .insert("Haus".to_string(), ReviewState::new(now()));

        let json = serde_json::to_string(&snapshot).unwrap();
        let patch: SnapshotPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(patch, SnapshotPatch::from(&snapshot));
    }

    #[test]
    fn partial_remote_document_leaves_fields_absent() {
        let patch: SnapshotPatch =
            serde_json::from_str(r#"{"coins": 7, "unknownField": true}"#).unwrap();
        assert_eq!(patch.coins, Some(7));
        assert_eq!(patch.level, None);
        assert_eq!(patch.review_states, None);
    }

    #[test]
    fn item_key_prefers_stable_id() {
        let mut item = VocabularyItem {
            id: None,
            word: "Hund".to_string(),
            translation: "dog".to_string(),
            article: Some("der".to_string()),
            plural: None,
            example: None,
            category: None,
            level: None,
        };
        assert_eq!(item.key(), "Hund");
        item.id = Some("w-0042".to_string());
        assert_eq!(item.key(), "w-0042");
    }
}
