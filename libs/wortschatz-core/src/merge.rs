//! Reconciliation of a local snapshot with the cloud copy.
//!
//! Fields present in the remote document replace the local value, except:
//! - `completed_modules` is the union of both sides
//! - `total_score` and `level` keep the larger value
//! - lesson progress keeps the higher star count per lesson

use std::collections::BTreeMap;

use crate::types::{AccountSnapshot, LessonProgress, SnapshotPatch};

/// Merge a remote snapshot into the local one.
pub fn merge_snapshots(local: &AccountSnapshot, remote: &SnapshotPatch) -> AccountSnapshot {
    let mut merged = local.clone();
    let account = &mut merged.account;

    if let Some(coins) = remote.coins {
        account.coins = coins;
    }
    if let Some(words) = &remote.learned_words {
        account.learned_words = words.clone();
    }
    if let Some(modules) = &remote.completed_modules {
        account.completed_modules.extend(modules.iter().cloned());
    }
    if let Some(score) = remote.total_score {
        account.total_score = account.total_score.max(score);
    }
    if let Some(level) = remote.level {
        account.level = account.level.max(level);
    }
    if let Some(achievements) = &remote.achievements {
        account.achievements = achievements.clone();
    }
    if let Some(claimed) = &remote.rewards_claimed {
        account.rewards_claimed = claimed.clone();
    }

    if let Some(lessons) = &remote.lesson_progress {
        merged.lesson_progress = merge_lessons(&local.lesson_progress, lessons);
    }
    if let Some(states) = &remote.review_states {
        merged.review_states = states.clone();
    }
    if remote.updated_at.is_some() {
        merged.updated_at = remote.updated_at;
    }

    merged
}

fn merge_lessons(
    local: &BTreeMap<String, LessonProgress>,
    remote: &BTreeMap<String, LessonProgress>,
) -> BTreeMap<String, LessonProgress> {
    let mut merged = local.clone();
    for (lesson_id, theirs) in remote {
        merged
            .entry(lesson_id.clone())
            .and_modify(|ours| {
                ours.stars = ours.stars.max(theirs.stars);
                ours.completed |= theirs.completed;
            })
            .or_insert(*theirs);
    }
    merged
}
