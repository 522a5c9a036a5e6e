use crate::models::{CommitRef, PullRequest};

const BRANCH_KEYWORDS: [&str; 2] = ["hotfix", "bugfix"];
// "bug" also covers "bugfix"
const LABEL_KEYWORDS: [&str; 2] = ["bug", "hotfix"];
const REVERT_PREFIX: &str = "revert";

/// Whether a merged pull request remediates a failure, judged by its head
/// branch name or its labels.
pub fn is_failure(pr: &PullRequest) -> bool {
    let branch = pr.head_ref.to_lowercase();
    let branch_hit = BRANCH_KEYWORDS.iter().any(|k| branch.contains(k));

    let label_hit = pr.labels.iter().any(|label| {
        let label = label.to_lowercase();
        LABEL_KEYWORDS.iter().any(|k| label.contains(k))
    });

    branch_hit || label_hit
}

pub fn is_revert(commit: &CommitRef) -> bool {
    commit
        .message
        .trim_start()
        .get(..REVERT_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(REVERT_PREFIX))
}

pub fn reverts(commits: &[CommitRef]) -> impl Iterator<Item = &CommitRef> {
    commits.iter().filter(|c| is_revert(c))
}
