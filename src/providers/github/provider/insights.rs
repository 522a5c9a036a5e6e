use chrono::Utc;
use log::{info, warn};

use super::core::GitHubProvider;
use crate::aggregate::RepositoryAnalyzer;
use crate::combine::combine;
use crate::insights::{DoraInsights, Period, RepositoryFailure};
use crate::providers::HostingApi;

impl<A: HostingApi> GitHubProvider<A> {
    /// Analyzes every configured repository in order.
    ///
    /// A repository whose pull request listing fails is reported in
    /// `failed_repositories` and the run moves on. The combined view is only
    /// built when more than one repository succeeded.
    pub async fn collect_insights(&self) -> DoraInsights {
        let config = &self.config;
        info!(
            "Starting DORA metrics collection for {} ({} repositories, {} ~ {})",
            config.owner,
            config.repositories.len(),
            config.window.from.format("%Y-%m-%d"),
            config.window.to.format("%Y-%m-%d")
        );

        if config.members.is_empty() {
            info!("Members: all contributors");
        } else {
            let members: Vec<_> = config.members.iter().map(ToString::to_string).collect();
            info!("Members: {}", members.join(", "));
        }

        let analyzer = RepositoryAnalyzer::new(
            &self.client,
            &config.owner,
            config.window,
            &config.members,
        )
        .with_concurrency(config.concurrency);

        let mut repositories = Vec::with_capacity(config.repositories.len());
        let mut failed_repositories = Vec::new();

        for repo in &config.repositories {
            match analyzer.analyze(repo).await {
                Ok(metrics) => repositories.push(metrics),
                Err(e) => {
                    warn!("Error analyzing {}/{repo}: {e}", config.owner);
                    failed_repositories.push(RepositoryFailure {
                        repository: repo.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if repositories.is_empty() {
            warn!("No repositories could be analyzed");
        }

        let combined = if repositories.len() > 1 {
            combine(&repositories)
        } else {
            None
        };

        DoraInsights {
            provider: "GitHub".to_string(),
            owner: config.owner.clone(),
            collected_at: Utc::now(),
            period: Period::from(&config.window),
            repositories,
            combined,
            failed_repositories,
        }
    }
}
