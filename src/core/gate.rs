//! Top-level release gate: deploy the changed pages, or revert the merge
//! that produced them.

use serde::Serialize;

use crate::changeset;
use crate::config::Config;
use crate::deploy::{BatchOutcome, Deployer, DeploymentQueue, PagePusher, SfCli};
use crate::error::{Error, Result};
use crate::github::GithubClient;
use crate::revert::{RevertCoordinator, RevertOutcome, RevertRemote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Every page in the batch deployed.
    Deployed,
    /// The batch failed and a revert pull request was opened.
    Reverted,
}

/// What one gate run did.
#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub status: GateStatus,
    pub pages: Vec<String>,
    pub deployed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert: Option<RevertOutcome>,
}

/// High-level entry point. Builds the production pusher and GitHub client;
/// `execute` holds the control flow and takes both as injected
/// collaborators.
pub fn run(config: &Config) -> Result<GateOutcome> {
    let pusher = SfCli::new(config.pages_dir.clone());
    let remote = GithubClient::new(&config.github);
    execute(config, pusher, &remote)
}

/// Run the gate without compensation: a failed batch surfaces as an error
/// instead of a revert pull request.
pub fn run_without_revert(config: &Config) -> Result<GateOutcome> {
    let pusher = SfCli::new(config.pages_dir.clone());
    execute_deploy_only(config, pusher)
}

/// Filter the changed-file list down to deployable pages.
///
/// Absence of input and absence of matching pages are both hard errors,
/// never an empty success: the gate must not report a green run when
/// nothing was deployed.
pub fn plan(config: &Config) -> Result<Vec<String>> {
    if config.changed_files.trim().is_empty() {
        return Err(Error::no_changed_files());
    }

    let marker = config.pages_marker();
    let pages = changeset::filter_pages(&config.changed_files, &marker);
    if pages.is_empty() {
        return Err(Error::no_pages_matched(&marker));
    }

    Ok(pages)
}

pub fn execute<P, R>(config: &Config, pusher: P, remote: &R) -> Result<GateOutcome>
where
    P: PagePusher,
    R: RevertRemote,
{
    let (pages, outcome) = drain_batch(config, pusher)?;

    match outcome {
        BatchOutcome::Completed { deployed } => Ok(GateOutcome {
            status: GateStatus::Deployed,
            pages,
            deployed,
            failed_page: None,
            revert: None,
        }),
        BatchOutcome::Failed {
            page,
            attempts,
            diagnostic,
            deployed,
        } => {
            eprintln!(
                "[gate] {} could not be deployed after {} attempts: {}",
                page, attempts, diagnostic
            );
            eprintln!(
                "[gate] Creating a revert PR for {}",
                config.github.commit_sha
            );

            let coordinator = RevertCoordinator::new(remote, &config.github.base_branch);
            let revert = coordinator.run(&config.github.commit_sha)?;

            Ok(GateOutcome {
                status: GateStatus::Reverted,
                pages,
                deployed,
                failed_page: Some(page),
                revert: Some(revert),
            })
        }
    }
}

pub fn execute_deploy_only<P: PagePusher>(config: &Config, pusher: P) -> Result<GateOutcome> {
    let (pages, outcome) = drain_batch(config, pusher)?;

    match outcome {
        BatchOutcome::Completed { deployed } => Ok(GateOutcome {
            status: GateStatus::Deployed,
            pages,
            deployed,
            failed_page: None,
            revert: None,
        }),
        BatchOutcome::Failed {
            page,
            attempts,
            diagnostic,
            ..
        } => Err(Error::retries_exhausted(&page, attempts, &diagnostic)),
    }
}

fn drain_batch<P: PagePusher>(config: &Config, pusher: P) -> Result<(Vec<String>, BatchOutcome)> {
    let pages = plan(config)?;
    eprintln!("[deploy] Deploying {} page(s)", pages.len());

    let mut queue = DeploymentQueue::new();
    queue.enqueue(pages.iter().cloned());

    let mut deployer = Deployer::new(pusher, config.retry);
    let outcome = deployer.drain(queue, &config.sync_flags());

    Ok((pages, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GithubConfig, RetryPolicy};
    use crate::deploy::PushError;
    use crate::error::ErrorCode;
    use crate::github::MergeCommit;
    use std::cell::RefCell;
    use std::time::Duration;

    fn test_config(changed_files: &str) -> Config {
        Config {
            changed_files: changed_files.to_string(),
            target_alias: Some("ci-target".to_string()),
            pages_dir: "skuidpages".to_string(),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::ZERO,
            },
            github: GithubConfig {
                api_url: "https://api.github.com".to_string(),
                token: "t".to_string(),
                owner: "octo".to_string(),
                repo: "site".to_string(),
                commit_sha: "abc1234def5678".to_string(),
                base_branch: "main".to_string(),
            },
        }
    }

    struct RecordingPusher {
        fail_page: Option<String>,
        invocations: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl RecordingPusher {
        fn succeeding() -> Self {
            Self {
                fail_page: None,
                invocations: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(page: &str) -> Self {
            Self {
                fail_page: Some(page.to_string()),
                invocations: RefCell::new(Vec::new()),
            }
        }
    }

    impl PagePusher for RecordingPusher {
        fn push(
            &self,
            page: &str,
            sync_flags: &[String],
        ) -> std::result::Result<String, PushError> {
            self.invocations
                .borrow_mut()
                .push((page.to_string(), sync_flags.to_vec()));
            if self.fail_page.as_deref() == Some(page) {
                Err(PushError::Execution {
                    exit_code: 1,
                    diagnostic: "metadata mismatch".to_string(),
                })
            } else {
                Ok(String::new())
            }
        }
    }

    struct FakeRemote {
        reverted_shas: RefCell<Vec<String>>,
        pr_titles: RefCell<Vec<String>>,
    }

    impl FakeRemote {
        fn new() -> Self {
            Self {
                reverted_shas: RefCell::new(Vec::new()),
                pr_titles: RefCell::new(Vec::new()),
            }
        }
    }

    impl RevertRemote for FakeRemote {
        fn commit(&self, sha: &str) -> Result<MergeCommit> {
            self.reverted_shas.borrow_mut().push(sha.to_string());
            Ok(MergeCommit {
                sha: sha.to_string(),
                message: "Merge pull request #42".to_string(),
                tree_sha: "tree_sha".to_string(),
            })
        }

        fn branch_tip(&self, _branch: &str) -> Result<String> {
            Ok("base_tip_sha".to_string())
        }

        fn create_branch(&self, _name: &str, _sha: &str) -> Result<()> {
            Ok(())
        }

        fn create_commit(
            &self,
            _message: &str,
            _tree_sha: &str,
            _parent_sha: &str,
        ) -> Result<String> {
            Ok("revert_commit_sha".to_string())
        }

        fn open_pull_request(
            &self,
            title: &str,
            _head: &str,
            _base: &str,
            _body: &str,
        ) -> Result<String> {
            self.pr_titles.borrow_mut().push(title.to_string());
            Ok("https://github.com/octo/site/pull/7".to_string())
        }
    }

    #[test]
    fn plan_filters_pages_in_order() {
        let config = test_config("skuidpages/a.xml other/b.txt skuidpages/sub/c.xml");
        assert_eq!(plan(&config).unwrap(), vec!["a.xml", "c.xml"]);
    }

    #[test]
    fn plan_rejects_empty_changed_files() {
        let config = test_config("  ");
        let err = plan(&config).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeployNoChangedFiles);
    }

    #[test]
    fn plan_rejects_changeset_without_pages() {
        let config = test_config("docs/readme.md src/main.rs");
        let err = plan(&config).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeployNoPages);
    }

    #[test]
    fn execute_deploys_every_page_with_shared_flags() {
        let config = test_config("skuidpages/a.xml other/b.txt skuidpages/sub/c.xml");
        let pusher = RecordingPusher::succeeding();
        let remote = FakeRemote::new();

        let outcome = execute(&config, pusher, &remote).unwrap();
        assert_eq!(outcome.status, GateStatus::Deployed);
        assert_eq!(outcome.pages, vec!["a.xml", "c.xml"]);
        assert_eq!(outcome.deployed, vec!["a.xml", "c.xml"]);
        assert!(outcome.revert.is_none());
        assert!(remote.reverted_shas.borrow().is_empty());
    }

    #[test]
    fn execute_reverts_when_a_page_exhausts_retries() {
        let config = test_config("skuidpages/a.xml skuidpages/sub/c.xml");
        let pusher = RecordingPusher::failing_on("a.xml");
        let remote = FakeRemote::new();

        let outcome = execute(&config, pusher, &remote).unwrap();
        assert_eq!(outcome.status, GateStatus::Reverted);
        assert_eq!(outcome.failed_page.as_deref(), Some("a.xml"));
        assert!(outcome.deployed.is_empty());

        let revert = outcome.revert.unwrap();
        assert_eq!(revert.branch, "revert-abc1234");
        assert_eq!(revert.revert_commit_sha, "revert_commit_sha");

        assert_eq!(*remote.reverted_shas.borrow(), vec!["abc1234def5678"]);
        assert_eq!(
            *remote.pr_titles.borrow(),
            vec!["Revert merge: Merge pull request #42"]
        );
    }

    #[test]
    fn execute_deploy_only_surfaces_batch_failure_as_error() {
        let config = test_config("skuidpages/a.xml");
        let pusher = RecordingPusher::failing_on("a.xml");

        let err = execute_deploy_only(&config, pusher).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeployRetriesExhausted);
        assert!(err.message.contains("a.xml"));
    }
}
