use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use super::core::GitHubClient;
use crate::config::Window;
use crate::error::Result;
use crate::models::CommitRef;

#[derive(Debug, Deserialize)]
pub struct GitActorDto {
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetailDto {
    #[serde(default)]
    pub message: String,
    pub author: Option<GitActorDto>,
}

#[derive(Debug, Deserialize)]
pub struct CommitDto {
    pub sha: String,
    pub commit: CommitDetailDto,
}

impl From<CommitDto> for CommitRef {
    fn from(dto: CommitDto) -> Self {
        Self {
            sha: dto.sha,
            message: dto.commit.message,
            authored_at: dto.commit.author.and_then(|a| a.date),
        }
    }
}

impl GitHubClient {
    pub async fn fetch_pull_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommitRef>> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["pulls", number.as_str(), "commits"])?;

        let commits: Vec<CommitDto> = self.get_all_pages(&url, &[]).await?;
        Ok(commits.into_iter().map(CommitRef::from).collect())
    }

    /// Commits reachable from `branch` that were committed inside `window`.
    pub async fn fetch_branch_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        window: &Window,
    ) -> Result<Vec<CommitRef>> {
        let url = self.repo_url(owner, repo, &["commits"])?;
        let since = window.from.to_rfc3339_opts(SecondsFormat::Secs, true);
        let until = window.to.to_rfc3339_opts(SecondsFormat::Secs, true);
        let query = [
            ("sha", branch),
            ("since", since.as_str()),
            ("until", until.as_str()),
        ];

        let commits: Vec<CommitDto> = self.get_all_pages(&url, &query).await?;
        Ok(commits.into_iter().map(CommitRef::from).collect())
    }
}
