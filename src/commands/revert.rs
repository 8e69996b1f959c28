use clap::Args;
use serde::Serialize;

use pagegate::config::Config;
use pagegate::github::GithubClient;
use pagegate::revert::{RevertCoordinator, RevertOutcome};

use super::CmdResult;

#[derive(Args)]
pub struct RevertArgs {
    /// Merge commit sha to revert (defaults to COMMIT_SHA)
    #[arg(long)]
    pub sha: Option<String>,
}

#[derive(Serialize)]
pub struct RevertOutput {
    pub command: String,
    pub outcome: RevertOutcome,
}

pub fn run(args: RevertArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RevertOutput> {
    let config = Config::from_env()?;
    let sha = args.sha.unwrap_or_else(|| config.github.commit_sha.clone());
    if sha.trim().is_empty() {
        return Err(pagegate::Error::validation_invalid_argument(
            "sha",
            "Commit sha must not be empty",
        ));
    }

    let remote = GithubClient::new(&config.github);
    let coordinator = RevertCoordinator::new(&remote, &config.github.base_branch);
    let outcome = coordinator.run(&sha)?;

    Ok((
        RevertOutput {
            command: "revert.run".to_string(),
            outcome,
        },
        0,
    ))
}
