//! Spaced repetition scheduling.

pub mod sm2;

use crate::types::{Grade, ReviewState};
use chrono::{DateTime, Utc};

/// Trait for spaced repetition schedulers.
pub trait Scheduler: Send + Sync {
    /// Scheduler identifier.
    fn name(&self) -> &'static str;

    /// State for an item that has never been graded.
    fn initial_state(&self, now: DateTime<Utc>) -> ReviewState;

    /// Calculate the state after grading an item at `now`.
    ///
    /// `previous` is `None` the first time an item is graded.
    fn compute_next_state(
        &self,
        previous: Option<&ReviewState>,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> ReviewState;
}

/// Get scheduler by name.
pub fn get_scheduler(name: &str) -> Option<Box<dyn Scheduler>> {
    match name {
        "sm2" => Some(Box::new(sm2::Sm2::default())),
        _ => None,
    }
}
