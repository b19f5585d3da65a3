//! Core vocabulary progress library used by the client runtime.
//!
//! Provides:
//! - SM-2 style review scheduling with a constant easiness factor
//! - Due selection and mastery counts
//! - Merge rules for local and cloud snapshots
//! - Migration of word-keyed progress to stable item ids
//! - Shared types (ReviewState, LessonProgress, AccountSnapshot, etc.)

pub mod algorithm;
pub mod error;
pub mod merge;
pub mod migration;
pub mod queue;
pub mod types;

pub use algorithm::{get_scheduler, sm2::Sm2, Scheduler};
pub use error::{Result, VocabError};
pub use merge::merge_snapshots;
pub use migration::{build_key_map, migrate_snapshot, MigrationReport};
pub use queue::{due_queue, mastered_count, select_due};
pub use types::{
    AccountProgress, AccountSnapshot, DeckSummary, Grade, LessonProgress, ReviewState,
    RewardOutcome, SnapshotPatch, VocabularyItem, MAX_STARS,
};
