//! Revert workflow: a four-step compensating transaction against the
//! source-control host.
//!
//! Entered only after a deployment batch has failed. Each step is a single
//! remote call; any non-success aborts the workflow immediately, in
//! deliberate contrast with the deployer's local retry.

use serde::Serialize;

use crate::error::Result;
use crate::github::MergeCommit;

pub const PULL_REQUEST_BODY: &str = "This pull request reverts a previous merge.";

/// Remote operations the revert workflow needs.
///
/// `GithubClient` implements this in production; tests substitute fakes.
pub trait RevertRemote {
    fn commit(&self, sha: &str) -> Result<MergeCommit>;
    fn branch_tip(&self, branch: &str) -> Result<String>;
    fn create_branch(&self, name: &str, sha: &str) -> Result<()>;
    fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str) -> Result<String>;
    fn open_pull_request(&self, title: &str, head: &str, base: &str, body: &str) -> Result<String>;
}

/// What a completed revert produced: one branch, one commit, one pull
/// request.
#[derive(Debug, Clone, Serialize)]
pub struct RevertOutcome {
    pub reverted_sha: String,
    pub branch: String,
    pub revert_commit_sha: String,
    pub pull_request_url: String,
}

/// Branch name for reverting a commit: `revert-` plus the first seven
/// characters of the sha.
pub fn revert_branch_name(sha: &str) -> String {
    let short: String = sha.chars().take(7).collect();
    format!("revert-{}", short)
}

pub fn revert_commit_message(original: &str) -> String {
    format!("Revert: {}", original)
}

pub fn pull_request_title(original: &str) -> String {
    format!("Revert merge: {}", original)
}

pub struct RevertCoordinator<'a, R: RevertRemote> {
    remote: &'a R,
    base_branch: &'a str,
}

impl<'a, R: RevertRemote> RevertCoordinator<'a, R> {
    pub fn new(remote: &'a R, base_branch: &'a str) -> Self {
        Self {
            remote,
            base_branch,
        }
    }

    /// Undo a merge at the source-control level.
    ///
    /// Fetches the merge commit, branches off the current base tip, creates
    /// a revert commit from the original tree with the original commit as
    /// sole parent, and opens a pull request back into the base branch.
    pub fn run(&self, commit_sha: &str) -> Result<RevertOutcome> {
        // Step 1: Fetch the merge commit being reverted
        let merge_commit = self.remote.commit(commit_sha)?;
        eprintln!(
            "[revert] Reverting commit {}: {}",
            merge_commit.sha, merge_commit.message
        );

        // Step 2: Branch off the current base tip
        let branch = revert_branch_name(commit_sha);
        let base_sha = self.remote.branch_tip(self.base_branch)?;
        self.remote.create_branch(&branch, &base_sha)?;
        eprintln!("[revert] Created branch {} at {}", branch, base_sha);

        // Step 3: Revert commit pointing at the original tree, parented on
        // the original commit
        let message = revert_commit_message(&merge_commit.message);
        let revert_commit_sha =
            self.remote
                .create_commit(&message, &merge_commit.tree_sha, &merge_commit.sha)?;

        // Step 4: Pull request from the revert branch into the base branch
        let title = pull_request_title(&merge_commit.message);
        let pull_request_url =
            self.remote
                .open_pull_request(&title, &branch, self.base_branch, PULL_REQUEST_BODY)?;
        eprintln!("[revert] Revert PR created: {}", pull_request_url);

        Ok(RevertOutcome {
            reverted_sha: merge_commit.sha,
            branch,
            revert_commit_sha,
            pull_request_url,
        })
    }
}
