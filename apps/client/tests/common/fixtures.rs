//! Test fixtures for snapshots and vocabulary.

use chrono::{DateTime, TimeZone, Utc};
use wortschatz_core::types::{AccountSnapshot, VocabularyItem};

pub const ACCOUNT: &str = "user-1";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn item(id: Option<&str>, word: &str, translation: &str) -> VocabularyItem {
    VocabularyItem {
        id: id.map(str::to_string),
        word: word.to_string(),
        translation: translation.to_string(),
        article: None,
        plural: None,
        example: None,
        category: None,
        level: Some("A1".to_string()),
    }
}

/// Three A1 nouns with stable ids.
pub fn sample_items() -> Vec<VocabularyItem> {
    vec![
        item(Some("w-1"), "Haus", "house"),
        item(Some("w-2"), "Hund", "dog"),
        item(Some("w-3"), "Katze", "cat"),
    ]
}

/// A snapshot with some progress in every account field.
pub fn snapshot_with(coins: u64, modules: &[&str], total_score: u64, level: u32) -> AccountSnapshot {
    let mut snapshot = AccountSnapshot::default();
    snapshot.account.coins = coins;
    snapshot.account.completed_modules = modules.iter().map(|m| m.to_string()).collect();
    snapshot.account.total_score = total_score;
    snapshot.account.level = level;
    snapshot
}
