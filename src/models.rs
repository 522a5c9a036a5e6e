use chrono::{DateTime, Utc};

use crate::contributor::Contributor;

#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub head_ref: String,
    pub author: Contributor,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CommitRef {
    pub sha: String,
    pub message: String,
    pub authored_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Review {
    pub reviewer: Contributor,
    pub submitted_at: Option<DateTime<Utc>>,
}
