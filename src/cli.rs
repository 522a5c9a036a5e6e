use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use crate::aggregate::DEFAULT_CONCURRENCY;
use crate::config::{AnalysisConfig, ConfigInput};
use crate::providers::github::{GitHubProvider, DEFAULT_API_URL, DEFAULT_TIMEOUT};

#[derive(Parser)]
#[command(name = "doralens")]
#[command(author, version, about = "DORA Metrics Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute delivery metrics from GitHub pull requests
    Github {
        /// GitHub API token
        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// GitHub API base URL
        #[arg(short, long, default_value = DEFAULT_API_URL)]
        url: String,

        /// GitHub organization or user
        #[arg(short = 'O', long, env = "GITHUB_OWNER")]
        owner: Option<String>,

        /// Comma-separated list of repository names
        #[arg(short, long, env = "GITHUB_REPOS", value_delimiter = ',')]
        repos: Vec<String>,

        /// Comma-separated list of usernames to include (all contributors when empty)
        #[arg(short, long, env = "GITHUB_MEMBERS", value_delimiter = ',')]
        members: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long, env = "DORA_FROM")]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long, env = "DORA_TO")]
        to: Option<String>,

        /// Number of pull requests fetched concurrently per repository
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
        timeout: u64,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Github {
                token,
                url,
                owner,
                repos,
                members,
                from,
                to,
                concurrency,
                timeout,
            } => {
                let config = AnalysisConfig::try_from(ConfigInput {
                    token,
                    owner,
                    repositories: repos,
                    members,
                    from,
                    to,
                    concurrency,
                })?;

                info!(
                    "Collecting DORA metrics for {} repositories of {}",
                    config.repositories.len(),
                    config.owner
                );

                let provider = GitHubProvider::new(&url, Duration::from_secs(timeout), config)?;
                let insights = provider.collect_insights().await;

                let json_output = if self.pretty {
                    serde_json::to_string_pretty(&insights)?
                } else {
                    serde_json::to_string(&insights)?
                };

                if let Some(output_path) = &self.output {
                    std::fs::write(output_path, json_output)?;
                    info!("Metrics written to: {}", output_path.display());
                } else {
                    println!("{json_output}");
                }

                Ok(())
            }
        }
    }
}
