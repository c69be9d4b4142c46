//! Newsdesk Crawler: binary entrypoint.
//! Runs a one-shot crawl (topics or sources) or boots the admin control surface.
//!
//! See `README.md` for quickstart.

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsdesk_crawler::config::AppConfig;
use newsdesk_crawler::{api, crawl};

#[derive(Parser)]
#[command(name = "newsdesk-crawler", about = "Personalized news ingestion and enrichment")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl configured topics and write the snapshot (default).
    Crawl,
    /// Crawl the fixed source list instead of topics.
    Sources,
    /// Run the admin control surface.
    Serve {
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("newsdesk_crawler=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env();

    match cli.command.unwrap_or(Command::Crawl) {
        Command::Crawl => {
            let n = crawl::run_topics(&cfg).await?;
            info!(items = n, "topic crawl finished");
        }
        Command::Sources => {
            let n = crawl::run_sources(&cfg).await?;
            info!(items = n, "source crawl finished");
        }
        Command::Serve { port } => {
            api::serve(cfg, port).await?;
        }
    }
    Ok(())
}
