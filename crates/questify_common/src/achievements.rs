//! Achievement definitions and the criteria evaluator.
//!
//! Definitions form a read-only catalog maintained by an admin process.
//! Each one names a criteria type and an integer threshold; a definition is
//! satisfied when the user's progress meets the threshold.

use serde::{Deserialize, Serialize};

use crate::level::Level;
use crate::progress::{AchievementId, ProgressSnapshot};

/// Category of condition an achievement checks.
///
/// Stored as its SCREAMING_CASE tag. Tags this build does not know are kept
/// verbatim in `Unknown` and are never satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CriteriaType {
    TasksCompleted,
    LevelReached,
    XpEarned,
    Unknown(String),
}

impl CriteriaType {
    pub fn as_str(&self) -> &str {
        match self {
            CriteriaType::TasksCompleted => "TASKS_COMPLETED",
            CriteriaType::LevelReached => "LEVEL_REACHED",
            CriteriaType::XpEarned => "XP_EARNED",
            CriteriaType::Unknown(tag) => tag,
        }
    }

    /// Human label, as shown in the admin catalog
    pub fn label(&self) -> &str {
        match self {
            CriteriaType::TasksCompleted => "Tasks Completed",
            CriteriaType::LevelReached => "Level Reached",
            CriteriaType::XpEarned => "XP Earned",
            CriteriaType::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CriteriaType::Unknown(_))
    }
}

impl From<&str> for CriteriaType {
    fn from(tag: &str) -> Self {
        match tag {
            "TASKS_COMPLETED" => CriteriaType::TasksCompleted,
            "LEVEL_REACHED" => CriteriaType::LevelReached,
            "XP_EARNED" => CriteriaType::XpEarned,
            other => CriteriaType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for CriteriaType {
    fn from(tag: String) -> Self {
        CriteriaType::from(tag.as_str())
    }
}

impl From<CriteriaType> for String {
    fn from(ct: CriteriaType) -> Self {
        ct.as_str().to_string()
    }
}

impl std::fmt::Display for CriteriaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An achievement in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    /// Unique display name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Icon hint for clients (e.g. "trophy")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub criteria_type: CriteriaType,
    pub criteria_value: i64,
    /// XP granted once, on unlock
    #[serde(default)]
    pub xp_reward: u64,
}

impl AchievementDefinition {
    pub fn new(id: i64, name: &str, criteria_type: CriteriaType, criteria_value: i64) -> Self {
        Self {
            id: AchievementId(id),
            name: name.to_string(),
            description: String::new(),
            icon: None,
            criteria_type,
            criteria_value,
            xp_reward: 0,
        }
    }

    pub fn with_reward(mut self, xp_reward: u64) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    /// Check this definition against a progress snapshot
    pub fn is_satisfied(&self, snapshot: &ProgressSnapshot) -> bool {
        is_satisfied(self, snapshot)
    }
}

/// Decide whether a definition's criteria hold for a snapshot.
///
/// Total over every definition: unknown criteria types are never satisfied.
pub fn is_satisfied(def: &AchievementDefinition, snapshot: &ProgressSnapshot) -> bool {
    match &def.criteria_type {
        CriteriaType::TasksCompleted => at_least(snapshot.completed_task_count, def.criteria_value),
        CriteriaType::LevelReached => Level::from_xp(snapshot.total_xp).meets(def.criteria_value),
        CriteriaType::XpEarned => at_least(snapshot.total_xp, def.criteria_value),
        CriteriaType::Unknown(_) => false,
    }
}

/// Compare an unsigned quantity against a signed threshold
fn at_least(value: u64, threshold: i64) -> bool {
    match u64::try_from(threshold) {
        Ok(t) => value >= t,
        Err(_) => true,
    }
}

/// Format a single achievement for an unlock notification
pub fn format_achievement_unlock(def: &AchievementDefinition) -> String {
    let badge = def.icon.as_deref().unwrap_or("*");
    if def.xp_reward > 0 {
        format!("[{}] Achievement unlocked: {} (+{} XP)", badge, def.name, def.xp_reward)
    } else {
        format!("[{}] Achievement unlocked: {}", badge, def.name)
    }
}
