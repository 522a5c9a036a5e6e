mod aggregate;
mod auth;
mod classify;
mod cli;
mod combine;
mod config;
mod contributor;
mod error;
mod insights;
mod metrics;
mod models;
mod providers;
mod stats;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting DoraLens - DORA Metrics Tool");
    cli.execute().await?;

    Ok(())
}
