mod cli;

use anyhow::Context;
use clap::Parser;
use membermatch::{
    embed::VoyageClient,
    find_nearest,
    seed::embed_pending,
    store::{MemoryStore, MongoStore},
    SearchConfig, SeedConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

/// Logs go to stderr so stdout only carries results
fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Nearest(args) => {
            let config = SearchConfig::from(args);
            let matches = match &cli.snapshot {
                Some(path) => {
                    let store = MemoryStore::load(path)?.with_similarity(args.similarity);
                    find_nearest(&store, &config).await?
                }
                None => {
                    let store = MongoStore::connect(&cli.mongo_config()?).await?;
                    find_nearest(&store, &config).await?
                }
            };
            print!("{}", cli::render(&matches, args.format)?);
        }

        Command::Seed(args) => {
            let config = SeedConfig::from(args);
            // Before any snapshot is loaded, so a bad setting leaves it untouched
            config.validate()?;
            let embedder = VoyageClient::new(&config);
            let report = match &cli.snapshot {
                Some(path) => {
                    let mut store = MemoryStore::load(path)?;
                    // Batches written before a failure are kept, as they are in MongoDB
                    let result = embed_pending(&mut store, &embedder, &config).await;
                    store
                        .save(path)
                        .with_context(|| format!("writing embeddings back to {}", path.display()))?;
                    result?
                }
                None => {
                    let mut store = MongoStore::connect(&cli.mongo_config()?).await?;
                    embed_pending(&mut store, &embedder, &config).await?
                }
            };
            info!(pending = report.pending, embedded = report.embedded, "Seeding finished");
        }
    }

    Ok(())
}
