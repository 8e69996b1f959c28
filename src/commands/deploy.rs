use clap::Args;
use serde::Serialize;

use pagegate::config::Config;
use pagegate::gate::{self, GateOutcome, GateStatus};

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// Report the filtered page plan without pushing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Fail without opening a revert pull request
    #[arg(long)]
    pub no_revert: bool,

    /// Pages directory marker (overrides SKUID_PAGES_DIR)
    #[arg(long)]
    pub pages_dir: Option<String>,
}

#[derive(Serialize)]
pub struct DeployOutput {
    pub command: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GateOutcome>,
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let mut config = Config::from_env()?;
    if let Some(dir) = args.pages_dir {
        config.pages_dir = dir;
    }

    if args.dry_run {
        let planned = gate::plan(&config)?;
        return Ok((
            DeployOutput {
                command: "deploy.plan".to_string(),
                dry_run: true,
                planned: Some(planned),
                outcome: None,
            },
            0,
        ));
    }

    let outcome = if args.no_revert {
        gate::run_without_revert(&config)?
    } else {
        gate::run(&config)?
    };

    // A reverted batch still fails the gate; the revert PR is the remedy,
    // not a success.
    let exit_code = match outcome.status {
        GateStatus::Deployed => 0,
        GateStatus::Reverted => 1,
    };

    Ok((
        DeployOutput {
            command: "deploy.run".to_string(),
            dry_run: false,
            planned: None,
            outcome: Some(outcome),
        },
        exit_code,
    ))
}
