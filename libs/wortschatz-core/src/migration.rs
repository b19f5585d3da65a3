//! Rekeying of word-keyed progress to stable item ids.
//!
//! Older snapshots key review states and learned words by the surface word.
//! Once the content service provides ids, progress is moved over using a
//! word → id mapping table built from the vocabulary list.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{AccountSnapshot, VocabularyItem};

/// Counts of entries moved to a new key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub review_states: usize,
    pub learned_words: usize,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.review_states == 0 && self.learned_words == 0
    }
}

/// Build the word → id table for items that carry a distinct id.
///
/// When two items share a surface word, the first one wins.
pub fn build_key_map(items: &[VocabularyItem]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for item in items {
        if let Some(id) = &item.id {
            if id != &item.word {
                map.entry(item.word.clone()).or_insert_with(|| id.clone());
            }
        }
    }
    map
}

/// Move word-keyed entries of `snapshot` to their mapped ids.
///
/// An entry already stored under the id is kept and the legacy one dropped.
pub fn migrate_snapshot(
    snapshot: &mut AccountSnapshot,
    key_map: &BTreeMap<String, String>,
) -> MigrationReport {
    let mut report = MigrationReport::default();

    for (word, id) in key_map {
        if let Some(state) = snapshot.review_states.remove(word) {
            snapshot.review_states.entry(id.clone()).or_insert(state);
            report.review_states += 1;
        }
        if snapshot.account.learned_words.remove(word) {
            snapshot.account.learned_words.insert(id.clone());
            report.learned_words += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReviewState;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn item(id: Option<&str>, word: &str) -> VocabularyItem {
        VocabularyItem {
            id: id.map(str::to_string),
            word: word.to_string(),
            translation: String::new(),
            article: None,
            plural: None,
            example: None,
            category: None,
            level: None,
        }
    }

    #[test]
    fn key_map_skips_items_without_distinct_id() {
        let items = vec![
            item(Some("w1"), "Haus"),
            item(None, "Baum"),
            item(Some("Tisch"), "Tisch"),
            item(Some("w9"), "Haus"),
        ];
        let map = build_key_map(&items);
        assert_eq!(map, BTreeMap::from([("Haus".to_string(), "w1".to_string())]));
    }

    #[test]
    fn migrate_moves_states_and_learned_words() {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut snapshot = AccountSnapshot::default();
        let haus = ReviewState {
            interval: 5,
            repetition: 2,
            ..ReviewState::new(now)
        };
        snapshot.review_states.insert("Haus".to_string(), haus.clone());
        snapshot.review_states.insert("Baum".to_string(), ReviewState::new(now));
        snapshot.account.learned_words.insert("Haus".to_string());

        let map = BTreeMap::from([("Haus".to_string(), "w1".to_string())]);
        let report = migrate_snapshot(&mut snapshot, &map);

        assert_eq!(
            report,
            MigrationReport {
                review_states: 1,
                learned_words: 1,
            }
        );
        assert_eq!(snapshot.review_states.get("w1"), Some(&haus));
        assert!(!snapshot.review_states.contains_key("Haus"));
        assert!(snapshot.review_states.contains_key("Baum"));
        assert!(snapshot.account.learned_words.contains("w1"));
    }

    #[test]
    fn existing_id_entry_wins_over_legacy() {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut snapshot = AccountSnapshot::default();
        let migrated = ReviewState {
            interval: 12,
            ..ReviewState::new(now)
        };
        snapshot.review_states.insert("w1".to_string(), migrated.clone());
        snapshot.review_states.insert("Haus".to_string(), ReviewState::new(now));

        let map = BTreeMap::from([("Haus".to_string(), "w1".to_string())]);
        migrate_snapshot(&mut snapshot, &map);

        assert_eq!(snapshot.review_states.len(), 1);
        assert_eq!(snapshot.review_states["w1"], migrated);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut snapshot = AccountSnapshot::default();
        snapshot.review_states.insert("Haus".to_string(), ReviewState::new(now));
        let map = BTreeMap::from([("Haus".to_string(), "w1".to_string())]);

        migrate_snapshot(&mut snapshot, &map);
        assert!(migrate_snapshot(&mut snapshot, &map).is_empty());
    }
}
