use std::time::Duration;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::providers::github::client::GitHubClient;

pub struct GitHubProvider<A = GitHubClient> {
    pub client: A,
    pub config: AnalysisConfig,
}

impl GitHubProvider {
    pub fn new(base_url: &str, timeout: Duration, config: AnalysisConfig) -> Result<Self> {
        let client = GitHubClient::new(base_url, config.token.clone(), timeout)?;

        Ok(Self { client, config })
    }
}
