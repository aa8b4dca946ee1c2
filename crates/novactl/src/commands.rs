//! Subcommand implementations.
//!
//! Each command builds the orchestrator from config, invokes one direct
//! entry point and renders the result. Validation failures are ordinary
//! output, not process errors: the exit code stays zero so conversational
//! retries don't look like crashes.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;

use nova_core::llm::{DisabledGenerator, HttpGenerator, TextGenerator};
use nova_core::seed::seed_store;
use nova_core::store::SqliteStore;
use nova_core::{NovaConfig, Orchestrator};

use crate::output;

/// Default database location next to the binary's working directory.
const DEFAULT_DB_PATH: &str = "data/nova.db";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HistoryKind {
    Mood,
    Glucose,
    Food,
}

fn load_config(config_path: Option<&Path>) -> Result<NovaConfig> {
    match config_path {
        Some(path) => NovaConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(NovaConfig::default()),
    }
}

fn open_store(config: &NovaConfig, db_override: Option<&Path>) -> Result<SqliteStore> {
    let path = db_override
        .map(|p| p.to_path_buf())
        .or_else(|| config.db_path.as_ref().map(Into::into))
        .unwrap_or_else(|| DEFAULT_DB_PATH.into());
    SqliteStore::open_at(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Assemble the orchestrator: sqlite store plus the configured generation
/// backend (disabled unless the config enables it).
pub fn build_orchestrator(
    config_path: Option<&Path>,
    db_override: Option<&Path>,
) -> Result<Orchestrator> {
    let config = load_config(config_path)?;
    let store = open_store(&config, db_override)?;
    let generator: Box<dyn TextGenerator> = if config.generation.enabled {
        Box::new(HttpGenerator::new(config.generation.clone()))
    } else {
        Box::new(DisabledGenerator)
    };
    Ok(Orchestrator::new(Box::new(store), generator, config))
}

pub fn greet(orch: &mut Orchestrator, user: i64) -> Result<()> {
    output::render_result(&orch.greet(user));
    Ok(())
}

pub fn log_mood(orch: &mut Orchestrator, user: i64, label: &str) -> Result<()> {
    output::render_result(&orch.log_mood(user, label));
    Ok(())
}

pub fn log_glucose(orch: &mut Orchestrator, user: i64, reading: &str) -> Result<()> {
    output::render_result(&orch.log_glucose(user, reading));
    Ok(())
}

pub fn log_food(orch: &mut Orchestrator, user: i64, description: &str) -> Result<()> {
    output::render_result(&orch.log_food(user, description));
    Ok(())
}

pub fn meal_plan(orch: &mut Orchestrator, user: i64) -> Result<()> {
    output::render_result(&orch.generate_meal_plan(user));
    Ok(())
}

pub fn history(orch: &Orchestrator, user: i64, kind: HistoryKind, limit: usize) -> Result<()> {
    match kind {
        HistoryKind::Mood => {
            for record in orch.mood_history(user, limit)? {
                println!("{}  {} ({}/5)", record.timestamp, record.mood, record.score);
            }
        }
        HistoryKind::Glucose => {
            for record in orch.glucose_history(user, limit)? {
                println!(
                    "{}  {} mg/dL [{}]",
                    record.timestamp, record.reading, record.alert_level
                );
            }
        }
        HistoryKind::Food => {
            for record in orch.food_history(user, limit)? {
                println!("{}  {}", record.timestamp, record.description);
            }
        }
    }
    Ok(())
}

/// Create the database if needed and load the 100-user roster.
pub fn seed(config_path: Option<&Path>, db_override: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config, db_override)?;
    let inserted = seed_store(&store)?;
    if inserted == 0 {
        println!("Database already has users; nothing to do.");
    } else {
        println!("Seeded {inserted} users.");
    }
    Ok(())
}
