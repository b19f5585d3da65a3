//! Simplified SM-2 scheduler.
//!
//! Intervals grow by a fixed multiplier per grade. The easiness factor is
//! carried through untouched; it is not adapted from grades the way
//! canonical SuperMemo 2 does.

use super::Scheduler;
use crate::types::{Grade, ReviewState};
use chrono::{DateTime, Duration, Utc};

/// SM-2 variant with configurable multipliers.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub hard_multiplier: f64,
    pub good_multiplier: f64,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: ReviewState::DEFAULT_EASINESS,
            hard_multiplier: 1.2,
            good_multiplier: 2.5,
        }
    }
}

impl Scheduler for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self, now: DateTime<Utc>) -> ReviewState {
        ReviewState {
            easiness_factor: self.initial_ease,
            ..ReviewState::new(now)
        }
    }

    fn compute_next_state(
        &self,
        previous: Option<&ReviewState>,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> ReviewState {
        let base = previous
            .cloned()
            .unwrap_or_else(|| self.initial_state(now));

        let (interval, repetition) = match grade {
            Grade::Again => (1, 0),
            Grade::Hard => (
                grow(base.interval, self.hard_multiplier),
                base.repetition.saturating_add(1),
            ),
            Grade::Good => (
                grow(base.interval, self.good_multiplier),
                base.repetition.saturating_add(1),
            ),
        };

        ReviewState {
            interval,
            repetition,
            easiness_factor: base.easiness_factor,
            next_review_date: review_date(now, interval),
        }
    }
}

fn grow(interval: u32, multiplier: f64) -> u32 {
    // Float to int casts saturate at u32::MAX.
    ((f64::from(interval) * multiplier).floor() as u32).max(1)
}

fn review_date(now: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
