mod commits;
mod core;
mod pulls;

use async_trait::async_trait;

pub use self::core::{GitHubClient, DEFAULT_API_URL, DEFAULT_TIMEOUT};
use crate::config::Window;
use crate::error::Result;
use crate::models::{CommitRef, PullRequest, Review};
use crate::providers::HostingApi;

#[async_trait]
impl HostingApi for GitHubClient {
    async fn merged_pulls(
        &self,
        owner: &str,
        repo: &str,
        window: &Window,
    ) -> Result<Vec<PullRequest>> {
        self.fetch_merged_pulls(owner, repo, window).await
    }

    async fn pull_commits(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<CommitRef>> {
        self.fetch_pull_commits(owner, repo, number).await
    }

    async fn pull_reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>> {
        self.fetch_pull_reviews(owner, repo, number).await
    }

    async fn branch_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        window: &Window,
    ) -> Result<Vec<CommitRef>> {
        self.fetch_branch_commits(owner, repo, branch, window).await
    }
}
