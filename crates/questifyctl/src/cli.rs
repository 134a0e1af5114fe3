//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Questify CLI
#[derive(Parser, Debug)]
#[command(name = "questifyctl")]
#[command(about = "Questify - task tracking with XP, levels and achievements", long_about = None)]
#[command(version = env!("QUESTIFY_VERSION"))]
pub struct Cli {
    /// Database file (overrides the configured path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (overrides $QUESTIFY_CONFIG and defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database, optionally installing a catalog
    Init {
        /// Install the starter achievement catalog
        #[arg(long)]
        seed: bool,

        /// Install achievements from a TOML catalog file
        #[arg(long, conflicts_with = "seed")]
        catalog: Option<PathBuf>,
    },

    /// Register a user (creates their progress profile)
    Register {
        username: String,
    },

    /// Show a user's XP, level and unlocked achievements
    Profile {
        #[arg(long)]
        user: String,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskCommands,
    },

    /// Manage the achievement catalog
    Achievement {
        #[command(subcommand)]
        action: AchievementCommands,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        #[arg(long)]
        user: String,

        title: String,

        #[arg(long)]
        description: Option<String>,

        /// XP granted on completion (defaults to the configured value)
        #[arg(long, conflicts_with = "no_xp")]
        xp: Option<u64>,

        /// Task grants no XP
        #[arg(long)]
        no_xp: bool,
    },

    /// List a user's tasks
    List {
        #[arg(long)]
        user: String,
    },

    /// Show one task
    Show {
        #[arg(long)]
        user: String,

        task_id: i64,
    },

    /// Delete a task (earned XP and achievements are kept)
    Delete {
        #[arg(long)]
        user: String,

        task_id: i64,
    },

    /// Mark a task completed
    Complete {
        #[arg(long)]
        user: String,

        task_id: i64,
    },

    /// Edit task fields
    Edit(TaskEditArgs),
}

#[derive(Args, Debug)]
pub struct TaskEditArgs {
    #[arg(long)]
    pub user: String,

    pub task_id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Remove the description
    #[arg(long)]
    pub clear_description: bool,

    #[arg(long, conflicts_with = "no_xp")]
    pub xp: Option<u64>,

    /// Task grants no XP
    #[arg(long)]
    pub no_xp: bool,

    /// Set the completed flag (true|false)
    #[arg(long)]
    pub completed: Option<bool>,
}

/// Achievement subcommands
#[derive(Subcommand, Debug)]
pub enum AchievementCommands {
    /// List the catalog
    List,

    /// Insert or replace a catalog entry
    Add(AchievementAddArgs),

    /// Install every entry of a TOML catalog file
    Import {
        file: PathBuf,
    },

    /// Print the catalog as TOML (JSON with --json)
    Export,

    /// List a user's unlocked achievements
    Mine {
        #[arg(long)]
        user: String,
    },
}

#[derive(Args, Debug)]
pub struct AchievementAddArgs {
    #[arg(long)]
    pub id: i64,

    #[arg(long)]
    pub name: String,

    /// TASKS_COMPLETED, LEVEL_REACHED or XP_EARNED
    #[arg(long)]
    pub criteria: String,

    #[arg(long, allow_hyphen_values = true)]
    pub value: i64,

    #[arg(long, default_value_t = 0)]
    pub reward: u64,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub icon: Option<String>,
}
