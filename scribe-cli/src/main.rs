//! scribe CLI - operator tool for the scribe blog database
//!
//! Loads the layered config, opens the connection pool and runs entity
//! lifecycle operations (find, save, remove, count) from the command line.
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scribe_orm::Database;

mod commands;
mod config;
mod models;
mod tracing_setup;

use config::ScribeConfig;
use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    author,
    version,
    about = "Operator CLI for the scribe blog database",
    long_about = "Inspect and edit blog users, posts and comments through the scribe ORM. \
                  Reads ~/.scribe/config.toml (plus config.override.toml next to it)."
)]
struct Cli {
    /// Config file path
    #[arg(long, short = 'c', global = true, env = "SCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging (SQL and bound arguments)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect and run a trivial query
    Ping,
    /// Manage users (add, get, list, remove)
    User(commands::user::UserArgs),
    /// Blog post queries
    Blog(commands::blog::BlogArgs),
    /// Count rows for an entity shape
    Count(commands::count::CountArgs),
    /// Show the derived table layout and SQL for an entity shape
    Schema(commands::schema::SchemaArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Shape declarations are checked before anything touches the database
    models::derive_all().context("Invalid entity shape declaration")?;

    // Schema introspection works without a config or database
    if let Commands::Schema(args) = cli.command {
        init_tracing(&TracingConfig {
            debug: cli.debug,
            level: None,
        })
        .ok();
        return commands::run_schema(args);
    }

    let config = ScribeConfig::load(cli.config.as_deref())?;
    init_tracing(&TracingConfig {
        debug: cli.debug,
        level: config.log.level.clone(),
    })
    .ok();

    let db = Database::create(&config.database)
        .await
        .with_context(|| format!("Failed to connect using {:?}", config.path))?;

    let result = match cli.command {
        Commands::Ping => commands::run_ping(&db).await,
        Commands::User(args) => commands::run_user(args, &db).await,
        Commands::Blog(args) => commands::run_blog(args, &db).await,
        Commands::Count(args) => commands::run_count(args, &db).await,
        Commands::Schema(args) => commands::run_schema(args),
    };

    db.shutdown().await;
    result
}
