use chrono::Duration;
use futures::{stream, StreamExt};
use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::classify;
use crate::config::Window;
use crate::contributor::{Contributor, GHOST};
use crate::error::Result;
use crate::insights::{Period, RepositoryMetrics};
use crate::metrics::{self, Tally};
use crate::models::{CommitRef, PullRequest, Review};
use crate::providers::HostingApi;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Trunk branch names, tried in order.
pub const TRUNK_BRANCHES: [&str; 2] = ["main", "master"];

const PROGRESS_INTERVAL: usize = 10;

/// What one pull request contributes to the aggregates.
#[derive(Debug)]
struct PullOutcome {
    author: Contributor,
    failure: bool,
    lead_time: Option<Duration>,
    first_review: Option<Duration>,
}

impl PullOutcome {
    fn evaluate(pr: &PullRequest, commits: &[CommitRef], reviews: &[Review]) -> Self {
        let lead_time = lead_time(pr, commits).map(|lead| {
            if lead < Duration::zero() {
                warn!(
                    "PR #{} merged before its earliest commit ({}s), counting zero lead time",
                    pr.number,
                    lead.num_seconds()
                );
                Duration::zero()
            } else {
                lead
            }
        });

        let failure = classify::is_failure(pr);
        if failure {
            debug!("PR #{} '{}' classified as failure", pr.number, pr.title);
        }

        Self {
            author: pr.author.clone(),
            failure,
            lead_time,
            first_review: time_to_first_review(pr, reviews),
        }
    }
}

/// Merge time minus the earliest commit author time.
pub fn lead_time(pr: &PullRequest, commits: &[CommitRef]) -> Option<Duration> {
    let merged_at = pr.merged_at?;
    let first_commit = commits.iter().filter_map(|c| c.authored_at).min()?;

    Some(merged_at - first_commit)
}

/// Creation time to the earliest review by someone other than the author.
///
/// Deleted accounts all share the ghost handle, so a ghost review on a ghost
/// pull request is not treated as a self-review.
pub fn time_to_first_review(pr: &PullRequest, reviews: &[Review]) -> Option<Duration> {
    let ghost_author = pr.author.handle().eq_ignore_ascii_case(GHOST);
    let first_review = reviews
        .iter()
        .filter(|r| ghost_author || r.reviewer != pr.author)
        .filter_map(|r| r.submitted_at)
        .min()?;

    Some(first_review - pr.created_at)
}

/// Shared state of one repository pass, guarded by a single lock.
#[derive(Debug, Default)]
struct Accumulator {
    repository: Tally,
    members: IndexMap<Contributor, Tally>,
    skipped: usize,
}

impl Accumulator {
    fn seeded(members: &[Contributor]) -> Self {
        Self {
            members: members
                .iter()
                .map(|m| (m.clone(), Tally::default()))
                .collect(),
            ..Self::default()
        }
    }

    fn fold(&mut self, outcome: PullOutcome) {
        self.repository
            .record(outcome.failure, outcome.lead_time, outcome.first_review);
        self.members.entry(outcome.author).or_default().record(
            outcome.failure,
            outcome.lead_time,
            outcome.first_review,
        );
    }

    fn skip(&mut self, author: &Contributor) {
        self.skipped += 1;
        self.repository.record_skipped();
        self.members
            .entry(author.clone())
            .or_default()
            .record_skipped();
    }
}

/// Computes the metrics of repositories owned by one account.
pub struct RepositoryAnalyzer<'a, A> {
    api: &'a A,
    owner: &'a str,
    window: Window,
    members: &'a [Contributor],
    concurrency: usize,
}

impl<'a, A: HostingApi> RepositoryAnalyzer<'a, A> {
    pub fn new(api: &'a A, owner: &'a str, window: Window, members: &'a [Contributor]) -> Self {
        Self {
            api,
            owner,
            window,
            members,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs the full pass for `repo`.
    ///
    /// Fails only when the merged pull request listing cannot be fetched.
    /// Pull requests whose commits or reviews cannot be fetched still count as
    /// merged, but are neither classified nor sampled.
    pub async fn analyze(&self, repo: &str) -> Result<RepositoryMetrics> {
        info!("Analyzing {}/{repo}...", self.owner);

        let pulls = self.fetch_pulls(repo).await?;
        info!("Found {} merged PRs in {}/{repo}", pulls.len(), self.owner);

        let revert_commits = self.count_trunk_reverts(repo).await;

        let accumulator = Mutex::new(Accumulator::seeded(self.members));
        self.process_pulls(repo, &pulls, &accumulator).await;
        let accumulator = accumulator.into_inner();

        if accumulator.skipped > 0 {
            warn!(
                "Skipped {} of {} PRs in {}/{repo}",
                accumulator.skipped,
                pulls.len(),
                self.owner
            );
        }

        let metrics = metrics::finalize(
            accumulator.repository,
            revert_commits,
            self.window.days(),
            accumulator.members,
        );

        info!(
            "Finished {}/{repo}: {} deployments, {} failures",
            self.owner, metrics.deployments_total, metrics.failure_count
        );

        Ok(RepositoryMetrics {
            repository: repo.to_string(),
            period: Period::from(&self.window),
            prs_found: pulls.len(),
            prs_skipped: accumulator.skipped,
            metrics,
        })
    }

    async fn fetch_pulls(&self, repo: &str) -> Result<Vec<PullRequest>> {
        let mut pulls = self
            .api
            .merged_pulls(self.owner, repo, &self.window)
            .await?;

        if !self.members.is_empty() {
            pulls.retain(|pr| self.members.contains(&pr.author));
        }

        Ok(pulls)
    }

    async fn count_trunk_reverts(&self, repo: &str) -> usize {
        for branch in TRUNK_BRANCHES {
            match self
                .api
                .branch_commits(self.owner, repo, branch, &self.window)
                .await
            {
                Ok(commits) => {
                    let reverts: Vec<_> = classify::reverts(&commits).collect();
                    for revert in &reverts {
                        debug!("Revert commit {} on {branch}", revert.sha);
                    }
                    info!(
                        "Found {} revert commits among {} on {branch}",
                        reverts.len(),
                        commits.len()
                    );
                    return reverts.len();
                }
                Err(e) => debug!("Trunk branch '{branch}' unavailable for {repo}: {e}"),
            }
        }

        warn!(
            "Could not fetch trunk commits for {}/{repo}, counting no reverts",
            self.owner
        );
        0
    }

    async fn process_pulls(
        &self,
        repo: &str,
        pulls: &[PullRequest],
        accumulator: &Mutex<Accumulator>,
    ) {
        let total = pulls.len();

        stream::iter(pulls)
            .for_each_concurrent(self.concurrency, move |pr| async move {
                let fetched = tokio::try_join!(
                    self.api.pull_commits(self.owner, repo, pr.number),
                    self.api.pull_reviews(self.owner, repo, pr.number),
                );

                match fetched {
                    Ok((commits, reviews)) => {
                        let outcome = PullOutcome::evaluate(pr, &commits, &reviews);

                        let mut acc = accumulator.lock().await;
                        acc.fold(outcome);

                        let processed = acc.repository.prs_merged;
                        if processed % PROGRESS_INTERVAL == 0 {
                            info!("Processed {processed}/{total} PRs");
                        }
                    }
                    Err(e) => {
                        warn!("Could not fetch details of PR #{}, skipping it: {e}", pr.number);
                        accumulator.lock().await.skip(&pr.author);
                    }
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use reqwest::StatusCode;

    use super::*;
    use crate::error::DoraLensError;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn window() -> Window {
        Window::from_dates(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        )
        .unwrap()
    }

    fn pull(number: u64, author: &str, head_ref: &str, labels: &[&str]) -> PullRequest {
        PullRequest {
            number,
            title: format!("Change {number}"),
            head_ref: head_ref.to_string(),
            author: Contributor::new(author),
            created_at: at(2, 8),
            merged_at: Some(at(4, 8)),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    fn commit(message: &str, authored_at: DateTime<Utc>) -> CommitRef {
        CommitRef {
            sha: format!("sha-{}", authored_at.timestamp()),
            message: message.to_string(),
            authored_at: Some(authored_at),
        }
    }

    fn review(reviewer: &str, submitted_at: DateTime<Utc>) -> Review {
        Review {
            reviewer: Contributor::new(reviewer),
            submitted_at: Some(submitted_at),
        }
    }

    fn not_found(path: &str) -> DoraLensError {
        DoraLensError::Http {
            path: path.to_string(),
            status: StatusCode::NOT_FOUND,
        }
    }

    #[derive(Default)]
    struct FakeApi {
        pulls: Vec<PullRequest>,
        commits: HashMap<u64, Vec<CommitRef>>,
        reviews: HashMap<u64, Vec<Review>>,
        trunk: HashMap<&'static str, Vec<CommitRef>>,
        failing_pulls: HashSet<u64>,
        failing_reviews: HashSet<u64>,
        list_fails: bool,
    }

    #[async_trait]
    impl HostingApi for FakeApi {
        async fn merged_pulls(
            &self,
            _owner: &str,
            _repo: &str,
            _window: &Window,
        ) -> Result<Vec<PullRequest>> {
            if self.list_fails {
                return Err(not_found("/pulls"));
            }
            Ok(self.pulls.clone())
        }

        async fn pull_commits(
            &self,
            _owner: &str,
            _repo: &str,
            number: u64,
        ) -> Result<Vec<CommitRef>> {
            // Uneven latency so workers finish out of order
            tokio::time::sleep(std::time::Duration::from_millis((number * 7) % 5)).await;
            if self.failing_pulls.contains(&number) {
                return Err(not_found("/commits"));
            }
            Ok(self.commits.get(&number).cloned().unwrap_or_default())
        }

        async fn pull_reviews(
            &self,
            _owner: &str,
            _repo: &str,
            number: u64,
        ) -> Result<Vec<Review>> {
            tokio::time::sleep(std::time::Duration::from_millis((number * 3) % 4)).await;
            if self.failing_reviews.contains(&number) {
                return Err(not_found("/reviews"));
            }
            Ok(self.reviews.get(&number).cloned().unwrap_or_default())
        }

        async fn branch_commits(
            &self,
            _owner: &str,
            _repo: &str,
            branch: &str,
            _window: &Window,
        ) -> Result<Vec<CommitRef>> {
            self.trunk
                .get(branch)
                .cloned()
                .ok_or_else(|| not_found(branch))
        }
    }

    async fn analyze(api: &FakeApi, members: &[Contributor], concurrency: usize) -> RepositoryMetrics {
        RepositoryAnalyzer::new(api, "acme", window(), members)
            .with_concurrency(concurrency)
            .analyze("api")
            .await
            .unwrap()
    }

    #[test]
    fn test_lead_time_uses_earliest_commit() {
        let pr = pull(1, "alice", "feature/a", &[]);
        let commits = vec![
            commit("second", at(3, 10)),
            commit("first", at(3, 6)),
            CommitRef {
                sha: "undated".to_string(),
                message: "no date".to_string(),
                authored_at: None,
            },
        ];

        assert_eq!(lead_time(&pr, &commits), Some(Duration::hours(26)));
        assert_eq!(lead_time(&pr, &[]), None);
    }

    #[test]
    fn test_first_review_ignores_author() {
        let pr = pull(1, "Alice", "feature/a", &[]);
        let reviews = vec![
            review("alice", at(2, 9)),
            review("bob", at(2, 12)),
            review("carol", at(2, 11)),
        ];

        assert_eq!(time_to_first_review(&pr, &reviews), Some(Duration::hours(3)));
        assert_eq!(time_to_first_review(&pr, &reviews[..1]), None);
    }

    #[test]
    fn test_ghost_review_on_ghost_pull_counts() {
        let pr = pull(1, GHOST, "feature/a", &[]);
        let reviews = vec![review(GHOST, at(2, 10))];

        assert_eq!(time_to_first_review(&pr, &reviews), Some(Duration::hours(2)));
    }

    #[test]
    fn test_negative_lead_time_is_clamped() {
        let pr = pull(1, "alice", "feature/a", &[]);
        let commits = vec![commit("rebased later", at(5, 8))];

        let outcome = PullOutcome::evaluate(&pr, &commits, &[]);

        assert_eq!(outcome.lead_time, Some(Duration::zero()));
    }

    #[tokio::test]
    async fn test_failure_classification_scenario() {
        let api = FakeApi {
            pulls: vec![
                pull(1, "alice", "hotfix/x", &[]),
                pull(2, "bob", "feature/y", &["bug"]),
                pull(3, "alice", "feature/z", &[]),
            ],
            trunk: HashMap::from([("main", vec![commit("Add search", at(3, 1))])]),
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.metrics.deployments_total, 3);
        assert_eq!(metrics.metrics.failure_count, 2);
        assert!((metrics.metrics.change_failure_rate - 66.666_666).abs() < 0.001);
        assert!((metrics.metrics.deployment_frequency_per_day - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_pull_without_commits_has_no_lead_time_sample() {
        let api = FakeApi {
            pulls: vec![pull(1, "alice", "feature/a", &[]), pull(2, "alice", "feature/b", &[])],
            commits: HashMap::from([(1, vec![commit("work", at(3, 8))])]),
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.metrics.deployments_total, 2);
        assert_eq!(metrics.metrics.lead_time.samples, 1);
        assert_eq!(metrics.metrics.members[0].prs_merged, 2);
        assert_eq!(metrics.metrics.members[0].lead_time.samples, 1);
    }

    #[tokio::test]
    async fn test_self_review_has_no_first_review_sample() {
        let api = FakeApi {
            pulls: vec![pull(1, "alice", "feature/a", &[])],
            reviews: HashMap::from([(1, vec![review("ALICE", at(2, 9))])]),
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.metrics.deployments_total, 1);
        assert_eq!(metrics.metrics.time_to_first_review.samples, 0);
    }

    #[tokio::test]
    async fn test_failed_sub_fetch_skips_only_that_pull() {
        let api = FakeApi {
            pulls: vec![
                pull(1, "alice", "feature/a", &[]),
                pull(2, "bob", "hotfix/b", &[]),
                pull(3, "carol", "feature/c", &[]),
            ],
            failing_pulls: HashSet::from([2]),
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.prs_found, 3);
        assert_eq!(metrics.prs_skipped, 1);
        assert_eq!(metrics.metrics.deployments_total, 3);
        assert!((metrics.metrics.deployment_frequency_per_day - 0.3).abs() < 1e-9);
        // The hotfix branch is never classified once its details are missing
        assert_eq!(metrics.metrics.failure_prs, 0);

        let bob = metrics
            .metrics
            .members
            .iter()
            .find(|m| m.username == "bob")
            .unwrap();
        assert_eq!(bob.prs_merged, 1);
        assert_eq!(bob.failure_prs, 0);
        assert_eq!(bob.lead_time.samples, 0);
    }

    #[tokio::test]
    async fn test_failed_review_fetch_skips_only_that_pull() {
        let api = FakeApi {
            pulls: vec![
                pull(1, "alice", "feature/a", &[]),
                pull(2, "bob", "bugfix/b", &[]),
                pull(3, "carol", "feature/c", &[]),
            ],
            commits: HashMap::from([
                (1, vec![commit("work", at(3, 8))]),
                (2, vec![commit("fix", at(3, 8))]),
                (3, vec![commit("more work", at(4, 2))]),
            ]),
            reviews: HashMap::from([
                (1, vec![review("bob", at(2, 10))]),
                (2, vec![review("alice", at(2, 9))]),
                (3, vec![review("alice", at(2, 12))]),
            ]),
            failing_reviews: HashSet::from([2]),
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.prs_skipped, 1);
        assert_eq!(metrics.metrics.deployments_total, 3);
        assert_eq!(metrics.metrics.failure_prs, 0);
        assert_eq!(metrics.metrics.lead_time.samples, 2);
        assert_eq!(metrics.metrics.time_to_first_review.samples, 2);
        // Reviews after 2h and 4h
        assert!((metrics.metrics.time_to_first_review.average_seconds - 10_800.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_repository() {
        let api = FakeApi {
            list_fails: true,
            ..FakeApi::default()
        };

        let result = RepositoryAnalyzer::new(&api, "acme", window(), &[])
            .analyze("api")
            .await;

        assert!(matches!(result, Err(DoraLensError::Http { .. })));
    }

    #[tokio::test]
    async fn test_trunk_falls_back_to_master() {
        let api = FakeApi {
            pulls: vec![pull(1, "alice", "feature/a", &[])],
            trunk: HashMap::from([(
                "master",
                vec![
                    commit("Revert \"Add search\"", at(3, 1)),
                    commit("Add search", at(2, 1)),
                ],
            )]),
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.metrics.revert_commits, 1);
        assert_eq!(metrics.metrics.failure_count, 1);
        assert!((metrics.metrics.change_failure_rate - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_trunk_counts_no_reverts() {
        let api = FakeApi {
            pulls: vec![pull(1, "alice", "feature/a", &[])],
            ..FakeApi::default()
        };

        let metrics = analyze(&api, &[], DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.metrics.revert_commits, 0);
        assert_eq!(metrics.metrics.deployments_total, 1);
    }

    #[tokio::test]
    async fn test_allow_list_filters_and_seeds_members() {
        let api = FakeApi {
            pulls: vec![pull(1, "Alice", "feature/a", &[]), pull(2, "mallory", "feature/b", &[])],
            ..FakeApi::default()
        };
        let members = vec![Contributor::new("alice"), Contributor::new("dave")];

        let metrics = analyze(&api, &members, DEFAULT_CONCURRENCY).await;

        assert_eq!(metrics.prs_found, 1);
        assert_eq!(metrics.metrics.deployments_total, 1);
        let names: Vec<_> = metrics
            .metrics
            .members
            .iter()
            .map(|m| (m.username.as_str(), m.prs_merged))
            .collect();
        assert_eq!(names, vec![("alice", 1), ("dave", 0)]);
    }

    #[tokio::test]
    async fn test_pool_size_does_not_change_results() {
        let authors = ["alice", "bob", "carol"];
        let mut api = FakeApi::default();
        for number in 1..=30_u64 {
            let author = authors[(number % 3) as usize];
            let branch = if number % 4 == 0 { "bugfix/x" } else { "feature/x" };
            api.pulls.push(pull(number, author, branch, &[]));
            let hour = u32::try_from(number % 24).unwrap();
            api.commits
                .insert(number, vec![commit("work", at(1, hour)), commit("more", at(3, 0))]);
            if number % 5 != 0 {
                api.reviews.insert(number, vec![review("reviewer", at(2, 8 + hour % 10))]);
            }
        }
        api.failing_pulls.insert(17);

        let serial = analyze(&api, &[], 1).await;
        let pooled = analyze(&api, &[], 10).await;

        assert_eq!(serial.prs_skipped, pooled.prs_skipped);
        assert_eq!(serial.metrics.deployments_total, pooled.metrics.deployments_total);
        assert_eq!(serial.metrics.failure_prs, pooled.metrics.failure_prs);
        assert_eq!(serial.metrics.lead_time, pooled.metrics.lead_time);
        assert_eq!(
            serial.metrics.time_to_first_review,
            pooled.metrics.time_to_first_review
        );
        assert_eq!(serial.metrics.members.len(), pooled.metrics.members.len());
        for (a, b) in serial.metrics.members.iter().zip(&pooled.metrics.members) {
            assert_eq!(a.username, b.username);
            assert_eq!(a.prs_merged, b.prs_merged);
            assert_eq!(a.failure_prs, b.failure_prs);
            assert_eq!(a.lead_time, b.lead_time);
            assert_eq!(a.time_to_first_review, b.time_to_first_review);
        }
    }
}
