use chrono::Duration;
use indexmap::IndexMap;

use crate::contributor::Contributor;
use crate::insights::{DeliveryMetrics, DurationSummary, MemberMetrics, Samples};
use crate::stats;

/// Raw counters and samples for one scope (a repository, a member, or a team).
///
/// Averages and medians are never kept here; they are derived once in
/// [`finalize`] from the pooled samples.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    pub prs_merged: usize,
    pub failure_prs: usize,
    pub samples: Samples,
}

impl Tally {
    pub fn record(
        &mut self,
        failure: bool,
        lead_time: Option<Duration>,
        first_review: Option<Duration>,
    ) {
        self.prs_merged += 1;
        if failure {
            self.failure_prs += 1;
        }
        if let Some(lead_time) = lead_time {
            self.samples.lead_times.push(lead_time);
        }
        if let Some(first_review) = first_review {
            self.samples.first_reviews.push(first_review);
        }
    }

    /// Counts a merged pull request whose details could not be fetched. It
    /// is neither classified nor sampled.
    pub fn record_skipped(&mut self) {
        self.prs_merged += 1;
    }

    pub fn absorb(&mut self, prs_merged: usize, failure_prs: usize, samples: &Samples) {
        self.prs_merged += prs_merged;
        self.failure_prs += failure_prs;
        self.samples.extend_from(samples);
    }

    fn into_member(self, contributor: &Contributor) -> MemberMetrics {
        MemberMetrics {
            username: contributor.handle().to_string(),
            prs_merged: self.prs_merged,
            failure_prs: self.failure_prs,
            lead_time: DurationSummary::from_samples(&self.samples.lead_times),
            time_to_first_review: DurationSummary::from_samples(&self.samples.first_reviews),
            samples: self.samples,
        }
    }
}

pub fn change_failure_rate(failures: usize, deployments: usize) -> f64 {
    // Trunk reverts are not tied to a PR, so the ratio can exceed one.
    stats::percentage(failures, deployments).min(100.0)
}

pub fn deployment_frequency(deployments: usize, days: i64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let frequency = deployments as f64 / days.max(1) as f64;
    frequency
}

pub fn finalize(
    team: Tally,
    revert_commits: usize,
    days: i64,
    mut members: IndexMap<Contributor, Tally>,
) -> DeliveryMetrics {
    members.sort_keys();

    let deployments_total = team.prs_merged;
    let failure_count = team.failure_prs + revert_commits;

    DeliveryMetrics {
        deployments_total,
        deployment_frequency_per_day: deployment_frequency(deployments_total, days),
        failure_prs: team.failure_prs,
        revert_commits,
        failure_count,
        change_failure_rate: change_failure_rate(failure_count, deployments_total),
        lead_time: DurationSummary::from_samples(&team.samples.lead_times),
        time_to_first_review: DurationSummary::from_samples(&team.samples.first_reviews),
        members: members
            .into_iter()
            .map(|(contributor, tally)| tally.into_member(&contributor))
            .collect(),
        samples: team.samples,
    }
}
