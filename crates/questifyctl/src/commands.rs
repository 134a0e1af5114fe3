//! Command execution
//!
//! Every command returns its output as a string; main prints it.

use anyhow::{Context, Result};
use questify_common::catalog::{default_catalog, import_catalog, install_catalog, render_catalog};
use questify_common::{
    complete_task, update_task, AchievementDefinition, AchievementId, CriteriaType, NewTask,
    ProgressStore, QuestifyConfig, StoreError, TaskId, TaskUpdate, UserId,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::cli::{AchievementAddArgs, AchievementCommands, Commands, TaskCommands, TaskEditArgs};
use crate::display;

/// Run one command against a store
pub fn run<S: ProgressStore>(
    command: &Commands,
    store: &S,
    config: &QuestifyConfig,
    json: bool,
) -> Result<String> {
    match command {
        Commands::Init { seed, catalog } => {
            let installed = if *seed {
                install_catalog(store, &default_catalog())?
            } else if let Some(path) = catalog {
                import_catalog(store, path)?
            } else {
                0
            };
            output(json, &serde_json::json!({ "installed": installed }), || {
                format!("Database ready, {} achievement(s) installed\n", installed)
            })
        }
        Commands::Register { username } => {
            let user_id = store
                .create_user(username)
                .with_context(|| format!("Failed to register '{}'", username))?;
            output(json, &serde_json::json!({ "user_id": user_id, "username": username }), || {
                format!("Registered {} (id {})\n", username, user_id)
            })
        }
        Commands::Profile { user } => profile(store, user, json),
        Commands::Task { action } => task(action, store, config, json),
        Commands::Achievement { action } => achievement(action, store, json),
    }
}

fn task<S: ProgressStore>(
    action: &TaskCommands,
    store: &S,
    config: &QuestifyConfig,
    json: bool,
) -> Result<String> {
    match action {
        TaskCommands::Add { user, title, description, xp, no_xp } => {
            let user_id = resolve_user(store, user)?;
            let xp_value = match (xp, no_xp) {
                (_, true) => None,
                (Some(xp), false) => Some(*xp),
                (None, false) => Some(config.tasks.default_xp_value),
            };
            let mut new_task = NewTask::new(title).with_xp(xp_value);
            new_task.description = description.clone();
            let created = store.create_task(user_id, &new_task)?;
            output(json, &created, || {
                format!("Created task #{} ({})\n", created.id, created.title)
            })
        }
        TaskCommands::List { user } => {
            let user_id = resolve_user(store, user)?;
            let tasks = store.tasks(user_id)?;
            output(json, &tasks, || display::render_tasks(&tasks))
        }
        TaskCommands::Show { user, task_id } => {
            let user_id = resolve_user(store, user)?;
            let task = store.find_task(user_id, TaskId(*task_id))?;
            output(json, &task, || display::render_task(&task))
        }
        TaskCommands::Delete { user, task_id } => {
            let user_id = resolve_user(store, user)?;
            let deleted = store
                .delete_task(user_id, TaskId(*task_id))
                .with_context(|| format!("Failed to delete task #{}", task_id))?;
            output(json, &deleted, || {
                format!("Deleted task #{} ({})\n", deleted.id, deleted.title)
            })
        }
        TaskCommands::Complete { user, task_id } => {
            let user_id = resolve_user(store, user)?;
            let outcome = complete_task(store, user_id, TaskId(*task_id))
                .with_context(|| format!("Failed to complete task #{}", task_id))?;
            output(json, &outcome, || display::render_completion(&outcome))
        }
        TaskCommands::Edit(args) => edit_task(args, store, json),
    }
}

fn edit_task<S: ProgressStore>(args: &TaskEditArgs, store: &S, json: bool) -> Result<String> {
    let user_id = resolve_user(store, &args.user)?;
    let description = match (&args.description, args.clear_description) {
        (_, true) => Some(None),
        (Some(text), false) => Some(Some(text.clone())),
        (None, false) => None,
    };
    let xp_value = match (args.xp, args.no_xp) {
        (_, true) => Some(None),
        (Some(xp), false) => Some(Some(xp)),
        (None, false) => None,
    };
    let update = TaskUpdate {
        title: args.title.clone(),
        description,
        completed: args.completed,
        xp_value,
    };
    let outcome = update_task(store, user_id, TaskId(args.task_id), &update)
        .with_context(|| format!("Failed to update task #{}", args.task_id))?;
    output(json, &outcome, || display::render_completion(&outcome))
}

fn achievement<S: ProgressStore>(
    action: &AchievementCommands,
    store: &S,
    json: bool,
) -> Result<String> {
    match action {
        AchievementCommands::List => {
            let catalog = store.achievements()?;
            output(json, &catalog, || display::render_catalog(&catalog))
        }
        AchievementCommands::Add(args) => add_achievement(args, store, json),
        AchievementCommands::Import { file } => {
            let installed = import_catalog(store, file)?;
            output(json, &serde_json::json!({ "installed": installed }), || {
                format!("Installed {} achievement(s) from {}\n", installed, file.display())
            })
        }
        AchievementCommands::Export => {
            let catalog = store.achievements()?;
            let rendered = render_catalog(&catalog)?;
            output(json, &catalog, || rendered)
        }
        AchievementCommands::Mine { user } => {
            let user_id = resolve_user(store, user)?;
            let unlocked = unlocked_with_definitions(store, user_id)?;
            let defs: Vec<_> = unlocked.iter().filter_map(|(_, d)| d.clone()).collect();
            output(json, &defs, || {
                if unlocked.is_empty() {
                    return "No achievements yet\n".to_string();
                }
                unlocked
                    .iter()
                    .map(|(event, def)| display::render_unlock(event, def.as_ref()) + "\n")
                    .collect()
            })
        }
    }
}

fn add_achievement<S: ProgressStore>(
    args: &AchievementAddArgs,
    store: &S,
    json: bool,
) -> Result<String> {
    let criteria_type = CriteriaType::from(args.criteria.to_uppercase());
    if !criteria_type.is_known() {
        warn!("Criteria type {} is not known; achievement will never unlock", criteria_type);
    }
    let mut def = AchievementDefinition::new(args.id, &args.name, criteria_type, args.value)
        .with_reward(args.reward)
        .with_description(&args.description);
    def.icon = args.icon.clone();

    store
        .put_achievement(&def)
        .with_context(|| format!("Failed to store achievement {}", args.id))?;
    output(json, &def, || format!("Stored achievement {} ({})\n", def.id, def.name))
}

#[derive(Serialize)]
struct ProfileView<'a> {
    username: &'a str,
    #[serde(flatten)]
    level: questify_common::LevelProgress,
    achievements: Vec<AchievementDefinition>,
}

fn profile<S: ProgressStore>(store: &S, username: &str, json: bool) -> Result<String> {
    let user_id = resolve_user(store, username)?;
    let progress = store.progress(user_id)?;
    let unlocked = unlocked_with_definitions(store, user_id)?;

    let view = ProfileView {
        username,
        level: progress.level_progress(),
        achievements: unlocked.iter().filter_map(|(_, d)| d.clone()).collect(),
    };
    output(json, &view, || display::render_profile(username, &progress, &unlocked))
}

type UnlockRow = (questify_common::UnlockEvent, Option<AchievementDefinition>);

fn unlocked_with_definitions<S: ProgressStore>(store: &S, user_id: UserId) -> Result<Vec<UnlockRow>> {
    let catalog: HashMap<AchievementId, AchievementDefinition> = store
        .achievements()?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();
    Ok(store
        .unlocks(user_id)?
        .into_iter()
        .map(|event| {
            let def = catalog.get(&event.achievement_id).cloned();
            (event, def)
        })
        .collect())
}

fn resolve_user<S: ProgressStore>(store: &S, username: &str) -> Result<UserId> {
    store
        .find_user(username)?
        .ok_or_else(|| StoreError::not_found("user", username).into())
}

fn output<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    } else {
        Ok(text())
    }
}
