//! Text rendering for questifyctl.
//!
//! Profiles get an XP bar for the current level band. Renderers return
//! strings so commands can be tested without a terminal.

use questify_common::achievements::format_achievement_unlock;
use questify_common::{
    AchievementDefinition, CompletionOutcome, LevelProgress, Task, UnlockEvent, UserProgress,
};
use std::fmt::Write;

pub mod colors {
    pub const HEADER: &str = "\x1b[38;2;255;210;120m";
    pub const OK: &str = "\x1b[38;2;120;255;120m";
    pub const DIM: &str = "\x1b[38;2;140;140;140m";
    pub const CYAN: &str = "\x1b[38;2;100;200;255m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

const BAR_WIDTH: usize = 20;

/// `[=====-----]` bar for progress through the current level band
pub fn xp_bar(progress: &LevelProgress) -> String {
    let filled = ((progress.fraction() * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
    format!(
        "[{}{}{}{}{}]",
        colors::OK,
        "=".repeat(filled),
        colors::DIM,
        "-".repeat(BAR_WIDTH - filled),
        colors::RESET
    )
}

pub fn render_profile(
    username: &str,
    progress: &UserProgress,
    unlocked: &[(UnlockEvent, Option<AchievementDefinition>)],
) -> String {
    let lp = progress.level_progress();
    let mut out = String::new();
    let _ = writeln!(out, "{}{}{}", colors::HEADER, username, colors::RESET);
    let _ = writeln!(out, "  {}Level {}{} {}", colors::BOLD, lp.level, colors::RESET, xp_bar(&lp));
    let _ = writeln!(
        out,
        "  {}XP: {}/{} to next level ({} into level){}",
        colors::DIM,
        lp.total_xp,
        lp.xp_for_next_level,
        lp.xp_into_level,
        colors::RESET
    );

    if unlocked.is_empty() {
        let _ = writeln!(out, "  No achievements yet");
    } else {
        let _ = writeln!(out, "  Achievements ({}):", unlocked.len());
        for (event, def) in unlocked {
            let _ = writeln!(out, "    {}", render_unlock(event, def.as_ref()));
        }
    }
    out
}

pub fn render_unlock(event: &UnlockEvent, def: Option<&AchievementDefinition>) -> String {
    let when = event.unlocked_at.format("%Y-%m-%d %H:%M");
    match def {
        Some(def) => format!("{} {}{}{}", when, colors::CYAN, def.name, colors::RESET),
        None => format!("{} achievement #{}", when, event.achievement_id),
    }
}

pub fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks\n".to_string();
    }
    let mut out = String::new();
    for task in tasks {
        let mark = if task.completed { "x" } else { " " };
        let xp = task
            .xp_value
            .map(|xp| format!("{} XP", xp))
            .unwrap_or_else(|| "no XP".to_string());
        let _ = writeln!(out, "[{}] #{:<4} {} ({})", mark, task.id, task.title, xp);
    }
    out
}

pub fn render_task(task: &Task) -> String {
    let mut out = render_tasks(std::slice::from_ref(task));
    if let Some(description) = &task.description {
        let _ = writeln!(out, "  {}{}{}", colors::DIM, description, colors::RESET);
    }
    out
}

pub fn render_catalog(defs: &[AchievementDefinition]) -> String {
    if defs.is_empty() {
        return "Catalog is empty\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>4} {:24} {:18} {:>8} {:>8}",
        "Id", "Name", "Criteria", "Value", "Reward"
    );
    for def in defs {
        let _ = writeln!(
            out,
            "  {:>4} {:24} {:18} {:>8} {:>8}",
            def.id,
            def.name,
            def.criteria_type.label(),
            def.criteria_value,
            def.xp_reward
        );
    }
    out
}

pub fn render_completion(outcome: &CompletionOutcome) -> String {
    let mut out = String::new();
    if !outcome.triggered {
        let _ = writeln!(out, "Task #{} updated", outcome.task.id);
        return out;
    }

    let lp = outcome.progress.level_progress();
    let _ = writeln!(
        out,
        "Task #{} completed: +{} XP",
        outcome.task.id, outcome.xp_credited
    );
    for def in &outcome.newly_unlocked {
        let _ = writeln!(out, "  {}", format_achievement_unlock(def));
    }
    let _ = writeln!(out, "  Level {} {} {} XP", lp.level, xp_bar(&lp), lp.total_xp);
    out
}
