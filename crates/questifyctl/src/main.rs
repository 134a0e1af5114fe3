//! Questify Control - command-line driver for the Questify progress store
//!
//! Registers users, manages tasks and the achievement catalog, and runs the
//! progression engine when tasks are completed.

use anyhow::{Context, Result};
use clap::Parser;
use questify_common::{QuestifyConfig, SqliteProgressStore};
use tracing::debug;

use questifyctl::cli::Cli;
use questifyctl::{commands, errors, logging};

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            print!("{}", output);
            std::process::exit(errors::EXIT_SUCCESS);
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(errors::exit_code(&err));
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let config = match &cli.config {
        Some(path) => QuestifyConfig::load_from_path(path)?,
        None => QuestifyConfig::load()?,
    };
    logging::init(cli.verbose, &config.logging.level);

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.storage.resolved_db_path());
    debug!("Using database {}", db_path.display());
    let store = SqliteProgressStore::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    commands::run(&cli.command, &store, &config, cli.json)
}
