mod jsonl;
mod matching;
mod normalize;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "offerdb-cli")]
#[command(about = "Normalize dealer offers and match duplicates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Normalize raw dealer records into canonical offers
    Normalize {
        /// Dealer key from the dealer configuration (e.g., meny)
        #[arg(long)]
        dealer: String,
        /// Raw records, one JSON object per line
        #[arg(long)]
        input: PathBuf,
        /// Canonical offers, one JSON object per line
        #[arg(long)]
        output: PathBuf,
        /// Offer snapshot to upsert into; manual edits in it survive re-scrapes
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Group canonical offers into identity relations
    Match {
        /// Canonical offers, one JSON object per line
        #[arg(long)]
        input: PathBuf,
        /// Existing relation snapshot to extend
        #[arg(long)]
        relations: Option<PathBuf>,
        /// Where to write the relation snapshot
        #[arg(long)]
        output: PathBuf,
        /// Also link accepted text-similarity candidates
        #[arg(long)]
        similar: bool,
    },
    /// Print text-similarity candidates as JSON lines
    Similar {
        /// Canonical offers, one JSON object per line
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = offerdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize {
            dealer,
            input,
            output,
            store,
        } => normalize::run_normalize(&config, &dealer, &input, &output, store.as_deref()).await?,
        Commands::Match {
            input,
            relations,
            output,
            similar,
        } => {
            matching::run_match(&config, &input, relations.as_deref(), &output, similar).await?;
        }
        Commands::Similar { input } => matching::run_similar(&config, &input).await?,
    }

    Ok(())
}
