//! Due selection and mastery counts over review states.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{DeckSummary, ReviewState, VocabularyItem};

/// Keys of all items whose review date has been reached.
///
/// Yields in ascending key order. Each call starts from scratch, so the
/// result always reflects the states passed in.
pub fn select_due<'a>(
    states: &'a BTreeMap<String, ReviewState>,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a str> + 'a {
    states
        .iter()
        .filter(move |(_, state)| state.is_due(now))
        .map(|(key, _)| key.as_str())
}

/// Due keys ordered for a study session: most overdue first.
pub fn due_queue(states: &BTreeMap<String, ReviewState>, now: DateTime<Utc>) -> Vec<String> {
    let mut due: Vec<(&String, &ReviewState)> =
        states.iter().filter(|(_, state)| state.is_due(now)).collect();
    due.sort_by(|(a_key, a), (b_key, b)| {
        a.next_review_date
            .cmp(&b.next_review_date)
            .then_with(|| a_key.cmp(b_key))
    });
    due.into_iter().map(|(key, _)| key.clone()).collect()
}

/// Number of items with an interval above one day.
pub fn mastered_count(states: &BTreeMap<String, ReviewState>) -> usize {
    states.values().filter(|state| state.is_mastered()).count()
}

impl DeckSummary {
    /// Summarize a deck of items against the stored review states.
    ///
    /// Items never graded count as new and not as due.
    pub fn from_states(
        items: &[VocabularyItem],
        states: &BTreeMap<String, ReviewState>,
        now: DateTime<Utc>,
    ) -> Self {
        items
            .iter()
            .fold(Self::default(), |mut summary, item| {
                summary.total += 1;
                match states.get(item.key()) {
                    None => summary.new += 1,
                    Some(state) => {
                        if state.is_due(now) {
                            summary.due += 1;
                        }
                        if state.is_mastered() {
                            summary.mastered += 1;
                        }
                    }
                }
                summary
            })
    }
}
