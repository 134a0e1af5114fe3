//! Achievement catalog files.
//!
//! Admins maintain the catalog as TOML:
//!
//! ```toml
//! [[achievement]]
//! id = 1
//! name = "First Steps"
//! description = "Complete your first task"
//! icon = "star"
//! criteria_type = "TASKS_COMPLETED"
//! criteria_value = 1
//! xp_reward = 10
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::achievements::{AchievementDefinition, CriteriaType};
use crate::store::ProgressStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "achievement")]
    achievements: Vec<AchievementDefinition>,
}

/// Starter catalog installed by `questifyctl init --seed`
pub fn default_catalog() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(1, "First Steps", CriteriaType::TasksCompleted, 1)
            .with_description("Complete your first task")
            .with_icon("star")
            .with_reward(10),
        AchievementDefinition::new(2, "Getting Things Done", CriteriaType::TasksCompleted, 10)
            .with_description("Complete 10 tasks")
            .with_icon("checkmark-circle")
            .with_reward(25),
        AchievementDefinition::new(3, "Taskmaster", CriteriaType::TasksCompleted, 50)
            .with_description("Complete 50 tasks")
            .with_icon("trophy")
            .with_reward(100),
        AchievementDefinition::new(4, "Level Up", CriteriaType::LevelReached, 2)
            .with_description("Reach level 2")
            .with_icon("arrow-up"),
        AchievementDefinition::new(5, "Seasoned", CriteriaType::LevelReached, 5)
            .with_description("Reach level 5")
            .with_icon("medal")
            .with_reward(50),
        AchievementDefinition::new(6, "Centurion", CriteriaType::XpEarned, 100)
            .with_description("Earn 100 XP")
            .with_icon("flame"),
        AchievementDefinition::new(7, "XP Hoarder", CriteriaType::XpEarned, 1000)
            .with_description("Earn 1000 XP")
            .with_icon("diamond")
            .with_reward(100),
    ]
}

/// Parse a TOML catalog. Ids and names must be unique within the file.
pub fn parse_catalog(contents: &str) -> Result<Vec<AchievementDefinition>> {
    let file: CatalogFile = toml::from_str(contents).context("Failed to parse catalog")?;

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for def in &file.achievements {
        if !ids.insert(def.id) {
            bail!("Duplicate achievement id {} in catalog", def.id);
        }
        if !names.insert(def.name.as_str()) {
            bail!("Duplicate achievement name '{}' in catalog", def.name);
        }
        if !def.criteria_type.is_known() {
            warn!(
                "Achievement {} uses unknown criteria type {}; it will never unlock",
                def.id, def.criteria_type
            );
        }
    }

    Ok(file.achievements)
}

pub fn load_catalog_file(path: &Path) -> Result<Vec<AchievementDefinition>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_catalog(&contents).with_context(|| format!("Invalid catalog {}", path.display()))
}

/// Render definitions back to catalog TOML
pub fn render_catalog(defs: &[AchievementDefinition]) -> Result<String> {
    let file = CatalogFile {
        achievements: defs.to_vec(),
    };
    toml::to_string_pretty(&file).context("Failed to serialize catalog")
}

/// Put every definition into the store, returning how many were written
pub fn install_catalog<S: ProgressStore>(store: &S, defs: &[AchievementDefinition]) -> Result<usize> {
    for def in defs {
        store
            .put_achievement(def)
            .with_context(|| format!("Failed to store achievement {} ({})", def.id, def.name))?;
    }
    info!("Installed {} achievement definition(s)", defs.len());
    Ok(defs.len())
}

pub fn import_catalog<S: ProgressStore>(store: &S, path: &Path) -> Result<usize> {
    let defs = load_catalog_file(path)?;
    install_catalog(store, &defs)
}
