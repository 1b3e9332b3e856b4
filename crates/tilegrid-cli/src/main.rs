use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tilegrid",
    about = "Tilegrid — concurrent raster ingestion into tiled PostGIS repositories",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a product's rasters into every store endpoint of a repository.
    ///
    /// Images already present in the catalog are skipped, so re-running a
    /// partially failed batch completes only the missing work.
    Ingest {
        /// Repository descriptor (TOML)
        config: PathBuf,
        /// Repository name within the descriptor
        repository: String,
        /// Product name within the repository
        product: String,
        /// Concurrent workers per store endpoint
        #[arg(short, long, default_value_t = 6)]
        workers: usize,
    },
    /// List configured repositories, or the products of one repository.
    List {
        /// Repository descriptor (TOML)
        config: PathBuf,
        /// Repository name; omit to list repository names only
        repository: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tilegrid=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            config,
            repository,
            product,
            workers,
        } => commands::ingest::run(&config, &repository, &product, workers).await,
        Commands::List { config, repository } => {
            commands::list::run(&config, repository.as_deref())
        }
    }
}
