pub mod github;

use async_trait::async_trait;

use crate::config::Window;
use crate::error::Result;
use crate::models::{CommitRef, PullRequest, Review};

/// Read access to a code hosting service.
#[async_trait]
pub trait HostingApi: Sync {
    /// Pull requests merged inside `window`.
    ///
    /// Implementations may stop paging at the first item merged before
    /// `window.from`, so the listing they page through must be ordered from
    /// most to least recent.
    async fn merged_pulls(&self, owner: &str, repo: &str, window: &Window)
        -> Result<Vec<PullRequest>>;

    async fn pull_commits(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<CommitRef>>;

    async fn pull_reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>>;

    async fn branch_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        window: &Window,
    ) -> Result<Vec<CommitRef>>;
}
