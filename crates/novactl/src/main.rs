//! NOVA Control - CLI chat surface for the NOVA assistant.
//!
//! Thin conversational layer over `nova_core`: every subcommand maps to a
//! direct orchestrator entry point, and `chat` runs the interactive REPL.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use novactl::commands::{self, HistoryKind};

#[derive(Parser)]
#[command(name = "novactl")]
#[command(about = "NOVA - conversational health-tracking assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the sqlite database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat {
        /// User id (1-100)
        #[arg(long)]
        user: i64,
    },

    /// Greet a user and show their profile
    Greet {
        #[arg(long)]
        user: i64,
    },

    /// Log a mood label (happy, calm, tired, ...)
    Mood {
        #[arg(long)]
        user: i64,
        label: String,
    },

    /// Log a CGM glucose reading in mg/dL
    Cgm {
        #[arg(long)]
        user: i64,
        reading: String,
    },

    /// Log a meal or snack description
    Food {
        #[arg(long)]
        user: i64,
        description: Vec<String>,
    },

    /// Generate a personalized meal plan
    Plan {
        #[arg(long)]
        user: i64,
    },

    /// Show recent log history
    History {
        #[arg(long)]
        user: i64,
        #[arg(value_enum)]
        kind: HistoryKind,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Seed the database with the synthetic 100-user roster
    Seed,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let config = cli.config.as_deref();
    let db = cli.db.as_deref();

    if let Commands::Seed = cli.command {
        return commands::seed(config, db);
    }

    let mut orch = commands::build_orchestrator(config, db)?;

    match cli.command {
        Commands::Chat { user } => novactl::repl::run(&mut orch, user),
        Commands::Greet { user } => commands::greet(&mut orch, user),
        Commands::Mood { user, label } => commands::log_mood(&mut orch, user, &label),
        Commands::Cgm { user, reading } => commands::log_glucose(&mut orch, user, &reading),
        Commands::Food { user, description } => {
            commands::log_food(&mut orch, user, &description.join(" "))
        }
        Commands::Plan { user } => commands::meal_plan(&mut orch, user),
        Commands::History { user, kind, limit } => commands::history(&orch, user, kind, limit),
        Commands::Seed => unreachable!("handled above"),
    }
}
