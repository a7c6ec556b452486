use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

mod config;
mod logging;
mod server;

/// MyKomatsu identity and customer directory server.
#[derive(Parser)]
#[command(name = "mk-server", version, about)]
struct Cli {
    /// YAML configuration file. `MK__SECTION__KEY` environment variables
    /// override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init(&cfg.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting mk-server");
    server::run(cfg).await
}
