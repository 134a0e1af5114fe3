//! Award engine.
//!
//! Evaluates the whole catalog against a progress snapshot and resolves XP
//! cascades to convergence:
//!
//! 1. A pass walks the catalog in order. Every definition not yet unlocked
//!    whose criteria hold against the XP at pass start is unlocked, and its
//!    reward goes into the pass's pending XP.
//! 2. After the pass, pending XP is added to the total, so rewards only
//!    become visible to the next pass.
//! 3. Passes repeat until one unlocks nothing.
//!
//! `unlocked` grows on every productive pass and the catalog is finite, so
//! there are at most `catalog.len()` productive passes.
//!
//! The engine is pure: it never touches storage and never fails.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::achievements::{is_satisfied, AchievementDefinition};
use crate::progress::{ProgressSnapshot, UnlockEvent, UserProgress};

/// Result of evaluating a snapshot against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Progress after all passes
    pub progress: UserProgress,
    /// Newly unlocked definitions, in pass order then catalog order
    pub newly_unlocked: Vec<AchievementDefinition>,
    /// Passes that unlocked at least one achievement
    pub passes: usize,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.newly_unlocked.is_empty()
    }

    /// XP credited by rewards during this evaluation
    pub fn xp_gained(&self) -> u64 {
        self.newly_unlocked
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(d.xp_reward))
    }

    /// Unlock records to persist, all stamped with `at`
    pub fn unlock_events(&self, at: DateTime<Utc>) -> Vec<UnlockEvent> {
        self.newly_unlocked
            .iter()
            .map(|d| UnlockEvent {
                achievement_id: d.id,
                user_id: self.progress.user_id,
                unlocked_at: at,
            })
            .collect()
    }
}

/// Run passes over `catalog` until no new achievement unlocks.
///
/// `catalog` must already be in its fixed, reproducible order (by id when it
/// comes from a store); that order decides the order of `newly_unlocked`.
pub fn evaluate(
    progress: &UserProgress,
    catalog: &[AchievementDefinition],
    completed_task_count: u64,
) -> Evaluation {
    let mut xp = progress.total_xp;
    let mut unlocked = progress.unlocked.clone();
    let mut newly_unlocked = Vec::new();
    let mut passes = 0;

    loop {
        let snapshot = ProgressSnapshot {
            total_xp: xp,
            completed_task_count,
        };
        let mut pending_xp = 0u64;
        let mut pass_unlocks = Vec::new();

        for def in catalog {
            if unlocked.contains(&def.id) || !is_satisfied(def, &snapshot) {
                continue;
            }
            unlocked.insert(def.id);
            pending_xp = pending_xp.saturating_add(def.xp_reward);
            pass_unlocks.push(def.clone());
        }

        if pass_unlocks.is_empty() {
            break;
        }

        xp = xp.saturating_add(pending_xp);
        newly_unlocked.extend(pass_unlocks);
        passes += 1;
    }

    Evaluation {
        progress: UserProgress {
            user_id: progress.user_id,
            total_xp: xp,
            unlocked,
        },
        newly_unlocked,
        passes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::CriteriaType;
    use crate::progress::{AchievementId, UserId};

    fn user(xp: u64) -> UserProgress {
        let mut p = UserProgress::new(UserId(1));
        p.total_xp = xp;
        p
    }

    fn ids(eval: &Evaluation) -> Vec<i64> {
        eval.newly_unlocked.iter().map(|d| d.id.0).collect()
    }

    #[test]
    fn test_empty_catalog() {
        let eval = evaluate(&user(500), &[], 10);
        assert!(eval.is_empty());
        assert_eq!(eval.passes, 0);
        assert_eq!(eval.progress.total_xp, 500);
    }

    #[test]
    fn test_level_unlock_without_cascade() {
        let catalog = vec![
            AchievementDefinition::new(1, "A", CriteriaType::LevelReached, 2),
            AchievementDefinition::new(2, "B", CriteriaType::XpEarned, 150).with_reward(60),
        ];
        let eval = evaluate(&user(100), &catalog, 1);
        assert_eq!(ids(&eval), vec![1]);
        assert_eq!(eval.progress.total_xp, 100);
        assert_eq!(eval.passes, 1);
    }

    #[test]
    fn test_reward_visible_next_pass_only() {
        let catalog = vec![
            AchievementDefinition::new(1, "C", CriteriaType::TasksCompleted, 1).with_reward(60),
            AchievementDefinition::new(2, "D", CriteriaType::XpEarned, 150),
        ];
        let eval = evaluate(&user(90), &catalog, 1);
        assert_eq!(ids(&eval), vec![1, 2]);
        assert_eq!(eval.progress.total_xp, 150);
        assert_eq!(eval.passes, 2);
        assert_eq!(eval.xp_gained(), 60);
    }

    #[test]
    fn test_same_pass_rewards_do_not_stack() {
        // Both rewards are pending during pass 1; the XP check sees 0 XP
        let catalog = vec![
            AchievementDefinition::new(1, "first", CriteriaType::TasksCompleted, 1).with_reward(100),
            AchievementDefinition::new(2, "level 2", CriteriaType::LevelReached, 2),
        ];
        let eval = evaluate(&user(0), &catalog, 1);
        assert_eq!(ids(&eval), vec![1, 2]);
        assert_eq!(eval.passes, 2);
    }

    #[test]
    fn test_long_chain_converges() {
        // Each unlock funds the next one
        let catalog: Vec<_> = (1..=5)
            .map(|i| {
                AchievementDefinition::new(i, "chain", CriteriaType::XpEarned, (i - 1) * 100)
                    .with_reward(100)
            })
            .collect();
        let eval = evaluate(&user(0), &catalog, 0);
        assert_eq!(ids(&eval), vec![1, 2, 3, 4, 5]);
        assert_eq!(eval.passes, 5);
        assert_eq!(eval.progress.total_xp, 500);
    }

    #[test]
    fn test_already_unlocked_not_reawarded() {
        let catalog = vec![
            AchievementDefinition::new(1, "rich", CriteriaType::XpEarned, 10).with_reward(50),
        ];
        let mut start = user(100);
        start.unlocked.insert(AchievementId(1));
        let eval = evaluate(&start, &catalog, 0);
        assert!(eval.is_empty());
        assert_eq!(eval.progress.total_xp, 100);
    }

    #[test]
    fn test_unknown_criteria_skipped() {
        let catalog = vec![
            AchievementDefinition::new(1, "streak", CriteriaType::from("LOGIN_STREAK"), 0).with_reward(10),
            AchievementDefinition::new(2, "starter", CriteriaType::XpEarned, 0),
        ];
        let eval = evaluate(&user(0), &catalog, 0);
        assert_eq!(ids(&eval), vec![2]);
    }

    #[test]
    fn test_unlock_events() {
        let catalog = vec![AchievementDefinition::new(9, "x", CriteriaType::XpEarned, 0)];
        let eval = evaluate(&user(0), &catalog, 0);
        let at = Utc::now();
        let events = eval.unlock_events(at);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].achievement_id, AchievementId(9));
        assert_eq!(events[0].user_id, UserId(1));
        assert_eq!(events[0].unlocked_at, at);
    }
}
