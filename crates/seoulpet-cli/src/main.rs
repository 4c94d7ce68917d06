mod collect;
mod migrate;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::collect::CollectCommands;
use crate::migrate::MigrateCommands;

#[derive(Debug, Parser)]
#[command(name = "seoulpet-cli")]
#[command(about = "Seoul Open API pet data collector")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch upstream rows and upsert them into the database
    Collect {
        #[command(subcommand)]
        command: CollectCommands,
    },
    /// Manage schema migrations through sqlx-cli
    Migrate {
        /// Directory holding the migration files
        #[arg(long, default_value = "migrations")]
        source: String,

        #[command(subcommand)]
        command: MigrateCommands,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply the embedded migrations
    Migrate,
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Migrate { source, command } => {
            init_tracing("info")?;
            migrate::run_migrate(&command, &source).await
        }
        Commands::Collect { command } => {
            let config = load_config()?;
            collect::run_collect(&config, &command).await
        }
        Commands::Db { command } => {
            let config = load_config()?;
            run_db(&config, &command).await
        }
    }
}

/// Loads settings and installs the subscriber at the configured level.
fn load_config() -> anyhow::Result<seoulpet_core::AppConfig> {
    let config = seoulpet_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    Ok(config)
}

async fn run_db(config: &seoulpet_core::AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    let pool = seoulpet_db::connect_pool(
        &config.database_url,
        seoulpet_db::PoolConfig::from_app_config(config),
    )
    .await?;

    match command {
        DbCommands::Ping => {
            seoulpet_db::ping(&pool).await?;
            println!("database: ok");
        }
        DbCommands::Migrate => {
            let applied = seoulpet_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
