//! Reviewer CLI - command line interface for the reviewer assignment engine
//!
//! Every command prints its result as JSON on stdout; logs go to stderr.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reviewer_core::{CliOverrides, Config, Dependencies, IdMode};
use reviewer_db::Database;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{PrArgs, StatsArgs, TeamArgs, UserArgs};

/// Assign and reassign code reviewers within teams
#[derive(Parser, Debug)]
#[command(name = "reviewer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/reviewer/config.toml)
    #[arg(long, global = true, env = "REVIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config and env)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Identifier mode: generated or external (overrides config and env)
    #[arg(long, global = true)]
    id_mode: Option<IdMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage teams
    Team(TeamArgs),

    /// Manage users and deactivate them
    #[command(visible_alias = "u")]
    User(UserArgs),

    /// Create, reassign and merge pull requests
    Pr(PrArgs),

    /// Review load statistics
    Stats(StatsArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration with overrides
    let config = Config::load_with_overrides(
        cli.config.as_deref(),
        CliOverrides {
            database_path: cli.database.clone(),
            id_mode: cli.id_mode,
            log_level: cli.verbose.then(|| "debug".to_string()),
        },
    )?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!(
        database = %config.database.path.display(),
        id_mode = ?config.assignment.id_mode,
        max_reviewers = config.assignment.max_reviewers,
        "Configuration loaded"
    );

    if let Commands::Config = cli.command {
        return commands::show_config(&config, cli.config.as_deref());
    }

    let db = Database::open(&config.database).await?;
    let engine = reviewer_db::engine(&db, Dependencies::system(config.assignment.clone()));

    let result = match cli.command {
        Commands::Team(args) => args.execute(&engine).await,
        Commands::User(args) => args.execute(&engine).await,
        Commands::Pr(args) => args.execute(&engine).await,
        Commands::Stats(args) => args.execute(&engine).await,
        Commands::Config => Ok(()),
    };

    db.close().await;
    result
}
