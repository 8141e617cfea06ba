use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod crawl;

#[derive(Debug, Parser)]
#[command(name = "venuedb")]
#[command(about = "Crawl venue listings from the map service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Captured records as-is.
    Records,
    /// Text documents with filter metadata, for a search index.
    Index,
    /// Flat rows with typed columns and JSON payloads.
    Rows,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search the map for a city and category and capture every venue found.
    Crawl {
        #[arg(long)]
        city: String,
        #[arg(long)]
        category: String,
        /// Defaults to YMAPS_MAX_ITEMS.
        #[arg(long)]
        max_items: Option<usize>,
        /// Write JSON here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Records)]
        format: OutputFormat,
    },
    /// Print the effective CSS selectors as YAML.
    Selectors,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = venuedb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Crawl {
            city,
            category,
            max_items,
            output,
            format,
        }) => {
            let request = venuedb_core::CrawlRequest::new(
                city,
                category,
                max_items.unwrap_or(config.max_items),
            );
            crawl::run_crawl(&config, &request, output.as_deref(), format).await?;
        }
        Some(Commands::Selectors) => crawl::print_selectors(&config)?,
        None => Cli::command().print_help()?,
    }

    Ok(())
}
