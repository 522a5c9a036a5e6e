use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;

use super::core::GitHubClient;
use crate::config::Window;
use crate::contributor::{Contributor, GHOST};
use crate::error::Result;
use crate::models::{PullRequest, Review};

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct HeadDto {
    #[serde(rename = "ref")]
    pub ref_: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestDto {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub user: Option<UserDto>,
    pub head: HeadDto,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewDto {
    pub user: Option<UserDto>,
    pub submitted_at: Option<DateTime<Utc>>,
}

// Deleted accounts come back as a null user.
fn contributor(user: Option<UserDto>) -> Contributor {
    user.map_or_else(|| Contributor::new(GHOST), |u| Contributor::new(&u.login))
}

impl From<PullRequestDto> for PullRequest {
    fn from(dto: PullRequestDto) -> Self {
        Self {
            number: dto.number,
            title: dto.title,
            head_ref: dto.head.ref_,
            author: contributor(dto.user),
            created_at: dto.created_at,
            merged_at: dto.merged_at,
            labels: dto.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

impl From<ReviewDto> for Review {
    fn from(dto: ReviewDto) -> Self {
        Self {
            reviewer: contributor(dto.user),
            submitted_at: dto.submitted_at,
        }
    }
}

impl GitHubClient {
    /// Lists pull requests merged inside `window`.
    ///
    /// Closed pull requests are paged most recently updated first. Paging
    /// stops at a short page or at the first page holding a pull request
    /// merged before the window start.
    pub async fn fetch_merged_pulls(
        &self,
        owner: &str,
        repo: &str,
        window: &Window,
    ) -> Result<Vec<PullRequest>> {
        let url = self.repo_url(owner, repo, &["pulls"])?;
        let query = [
            ("state", "closed"),
            ("sort", "updated"),
            ("direction", "desc"),
        ];

        let mut merged = Vec::new();
        let mut page = 1;

        loop {
            let pulls: Vec<PullRequestDto> = self.get_page(&url, &query, page).await?;
            let fetched = pulls.len();
            let mut reached_window_start = false;

            for dto in pulls {
                let Some(merged_at) = dto.merged_at else {
                    continue;
                };
                if merged_at < window.from {
                    reached_window_start = true;
                } else if window.contains(merged_at) {
                    merged.push(PullRequest::from(dto));
                }
            }

            debug!(
                "Page {page}: fetched {fetched} closed PRs (merged in window so far: {})",
                merged.len()
            );

            if reached_window_start || fetched < self.per_page {
                break;
            }
            page += 1;
        }

        Ok(merged)
    }

    pub async fn fetch_pull_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>> {
        let number = number.to_string();
        let url = self.repo_url(owner, repo, &["pulls", number.as_str(), "reviews"])?;

        let reviews: Vec<ReviewDto> = self.get_all_pages(&url, &[]).await?;
        Ok(reviews.into_iter().map(Review::from).collect())
    }
}
