use indexmap::IndexMap;

use crate::contributor::Contributor;
use crate::insights::{CombinedMetrics, RepositoryMetrics};
use crate::metrics::{self, Tally};

/// Pools finalized repository metrics into one cross-repository view.
///
/// Counts are summed and raw samples concatenated before averages and
/// medians are recomputed, so members active in several repositories get
/// statistics over all their pull requests. The period comes from the first
/// repository. Returns `None` for an empty slice.
pub fn combine(repositories: &[RepositoryMetrics]) -> Option<CombinedMetrics> {
    let first = repositories.first()?;

    let mut team = Tally::default();
    let mut revert_commits = 0;
    let mut members: IndexMap<Contributor, Tally> = IndexMap::new();

    for repository in repositories {
        let repo = &repository.metrics;
        team.absorb(repo.deployments_total, repo.failure_prs, &repo.samples);
        revert_commits += repo.revert_commits;

        for member in &repo.members {
            members
                .entry(Contributor::new(&member.username))
                .or_default()
                .absorb(member.prs_merged, member.failure_prs, &member.samples);
        }
    }

    Some(CombinedMetrics {
        repositories: repositories.iter().map(|r| r.repository.clone()).collect(),
        period: first.period,
        metrics: metrics::finalize(team, revert_commits, first.period.days, members),
    })
}
