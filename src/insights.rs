use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::Window;
use crate::stats;

#[derive(Debug, Serialize)]
pub struct DoraInsights {
    pub provider: String,
    pub owner: String,
    pub collected_at: DateTime<Utc>,
    pub period: Period,
    pub repositories: Vec<RepositoryMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<CombinedMetrics>,
    pub failed_repositories: Vec<RepositoryFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub days: i64,
}

impl From<&Window> for Period {
    fn from(window: &Window) -> Self {
        Self {
            from: window.from,
            to: window.to,
            days: window.days(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DurationSummary {
    pub samples: usize,
    pub average_seconds: f64,
    pub median_seconds: f64,
}

impl DurationSummary {
    pub fn from_samples(samples: &[Duration]) -> Self {
        Self {
            samples: samples.len(),
            average_seconds: seconds(stats::average(samples)),
            median_seconds: seconds(stats::median(samples)),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// Raw duration samples, kept so aggregates can be pooled later.
#[derive(Debug, Clone, Default)]
pub struct Samples {
    pub lead_times: Vec<Duration>,
    pub first_reviews: Vec<Duration>,
}

impl Samples {
    pub fn extend_from(&mut self, other: &Samples) {
        self.lead_times.extend_from_slice(&other.lead_times);
        self.first_reviews.extend_from_slice(&other.first_reviews);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberMetrics {
    pub username: String,
    pub prs_merged: usize,
    pub failure_prs: usize,
    pub lead_time: DurationSummary,
    pub time_to_first_review: DurationSummary,
    #[serde(skip)]
    pub samples: Samples,
}

/// Delivery indicators shared by per-repository and combined views.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryMetrics {
    pub deployments_total: usize,
    pub deployment_frequency_per_day: f64,
    pub failure_prs: usize,
    pub revert_commits: usize,
    pub failure_count: usize,
    pub change_failure_rate: f64,
    pub lead_time: DurationSummary,
    pub time_to_first_review: DurationSummary,
    pub members: Vec<MemberMetrics>,
    #[serde(skip)]
    pub samples: Samples,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryMetrics {
    pub repository: String,
    pub period: Period,
    pub prs_found: usize,
    pub prs_skipped: usize,
    #[serde(flatten)]
    pub metrics: DeliveryMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedMetrics {
    pub repositories: Vec<String>,
    pub period: Period,
    #[serde(flatten)]
    pub metrics: DeliveryMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryFailure {
    pub repository: String,
    pub error: String,
}
