use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::info;

use cyclecount_api::migrator::Migrator;

#[derive(Parser)]
#[command(name = "migration", about = "Manage the cycle count database schema")]
struct Cli {
    /// Database URL; falls back to DATABASE_URL, then an on-disk SQLite file
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://cyclecount.db?mode=rwc")]
    database_url: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back the given number of migrations
    Down {
        #[arg(default_value_t = 1)]
        steps: u32,
    },
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<(), DbErr> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    info!("Connecting to database: {}", cli.database_url);

    let mut options = ConnectOptions::new(cli.database_url);
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true);

    let db = Database::connect(options).await?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            info!("Starting database migration");
            Migrator::up(&db, None).await?;
            info!("Migration completed successfully");
        }
        Command::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(&db, Some(steps)).await?;
        }
        Command::Status => Migrator::status(&db).await?,
    }

    Ok(())
}
