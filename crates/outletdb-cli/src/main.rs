mod ingest;
mod query;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "outletdb-cli")]
#[command(about = "outletdb operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run one ingestion now if the data is stale
    Ingest {
        /// Run even if the data is still fresh
        #[arg(long)]
        force: bool,
    },
    /// Show the staleness marker and gate decision
    Status,
    /// Look up the distance between two outlets in the matrix artifact
    Distance {
        a: Uuid,
        b: Uuid,
        /// Read this matrix instead of `OUTLETDB_DISTANCE_MATRIX_PATH`
        #[arg(long)]
        matrix: Option<PathBuf>,
    },
    /// List overlapping outlet pairs, optionally for one outlet
    Overlaps {
        #[arg(long)]
        outlet: Option<Uuid>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("outletdb-cli: pass --help for available commands");
        return Ok(());
    };

    let config = outletdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            outletdb_db::health_check(&connect(&config).await?).await?;
            println!("database reachable");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = outletdb_db::run_migrations(&connect(&config).await?).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Ingest { force } => {
            ingest::run_ingest(connect(&config).await?, &config, force).await?;
        }
        Commands::Status => query::run_status(&connect(&config).await?, &config).await?,
        Commands::Distance { a, b, matrix } => {
            let path = matrix.unwrap_or_else(|| config.distance_matrix_path.clone());
            query::run_distance(&path, a, b)?;
        }
        Commands::Overlaps { outlet } => {
            query::run_overlaps(&connect(&config).await?, outlet).await?;
        }
    }

    Ok(())
}

async fn connect(config: &outletdb_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = outletdb_db::PoolConfig::from_app_config(config);
    Ok(outletdb_db::connect_pool(&config.database_url, pool_config).await?)
}
