//! User progress snapshots and unlock records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::level::{Level, LevelProgress};

/// Identifier of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Identifier of an achievement definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's XP total and the achievements they have ever unlocked.
///
/// `unlocked` only ever grows; nothing in the crate removes from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: UserId,
    pub total_xp: u64,
    #[serde(default)]
    pub unlocked: BTreeSet<AchievementId>,
}

impl UserProgress {
    /// Fresh profile created alongside a new user
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            total_xp: 0,
            unlocked: BTreeSet::new(),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_xp(self.total_xp)
    }

    pub fn level_progress(&self) -> LevelProgress {
        LevelProgress::from_xp(self.total_xp)
    }

    pub fn has_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }

    /// Credit XP, saturating at u64::MAX
    pub fn credit_xp(&mut self, xp: u64) {
        self.total_xp = self.total_xp.saturating_add(xp);
    }
}

/// The inputs a criteria check reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total_xp: u64,
    pub completed_task_count: u64,
}

/// Append-only record that a user unlocked an achievement.
///
/// At most one exists per (user_id, achievement_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEvent {
    pub achievement_id: AchievementId,
    pub user_id: UserId,
    pub unlocked_at: DateTime<Utc>,
}
