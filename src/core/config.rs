use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_PAGES_DIR: &str = "skuidpages";
pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Retry behavior for a single page push.
///
/// The backoff is a constant delay between attempts, not exponential; batch
/// sizes are small and the job is short-lived, so growth buys nothing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// GitHub coordinates for the revert workflow.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
    pub token: String,
    pub owner: String,
    pub repo: String,
    /// Sha of the merge commit that triggered this pipeline run.
    pub commit_sha: String,
    pub base_branch: String,
}

/// Run configuration, read once from the environment at startup.
///
/// Components never read ambient process state; they take this value (or a
/// piece of it) explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Raw whitespace-separated changed-file list.
    pub changed_files: String,
    /// Deployment target alias, forwarded to the push tool as a sync flag.
    pub target_alias: Option<String>,
    /// Directory segment that marks a path as a deployable page.
    pub pages_dir: String,
    pub retry: RetryPolicy,
    pub github: GithubConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            changed_files: optional_var("ALL_CHANGED_FILES").unwrap_or_default(),
            target_alias: optional_var("TARGET_USERNAME_ALIAS"),
            pages_dir: optional_var("SKUID_PAGES_DIR")
                .unwrap_or_else(|| DEFAULT_PAGES_DIR.to_string()),
            retry: parse_retry_policy(
                optional_var("DEPLOY_MAX_RETRIES").as_deref(),
                optional_var("DEPLOY_BACKOFF_SECONDS").as_deref(),
            )?,
            github: GithubConfig {
                api_url: optional_var("GITHUB_API_URL")
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                token: required_var("GH_TOKEN")?,
                owner: required_var("REPO_OWNER")?,
                repo: required_var("REPO_NAME")?,
                commit_sha: required_var("COMMIT_SHA")?,
                base_branch: optional_var("BASE_BRANCH")
                    .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
            },
        })
    }

    /// Flags forwarded unchanged to every push invocation in a batch.
    pub fn sync_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(alias) = &self.target_alias {
            flags.push(format!("--targetusername={}", alias));
        }
        flags
    }

    /// Marker segment that identifies a deployable page path.
    pub fn pages_marker(&self) -> String {
        format!("{}/", self.pages_dir)
    }
}

/// Resolve the retry policy from optional overrides.
///
/// The delay stays constant per attempt; only its length and the attempt
/// cap are tunable.
fn parse_retry_policy(
    max_retries: Option<&str>,
    backoff_seconds: Option<&str>,
) -> Result<RetryPolicy> {
    let mut policy = RetryPolicy::default();
    if let Some(raw) = max_retries {
        policy.max_attempts = parse_count("DEPLOY_MAX_RETRIES", raw)?;
    }
    if let Some(raw) = backoff_seconds {
        policy.backoff = Duration::from_secs(parse_count("DEPLOY_BACKOFF_SECONDS", raw)? as u64);
    }
    Ok(policy)
}

fn parse_count(name: &str, raw: &str) -> Result<u32> {
    raw.trim().parse().map_err(|_| {
        Error::config_invalid_value(
            name,
            Some(raw.to_string()),
            "expected a non-negative integer",
        )
    })
}

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::config_missing_var(name)),
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_alias(alias: Option<&str>) -> Config {
        Config {
            changed_files: String::new(),
            target_alias: alias.map(String::from),
            pages_dir: DEFAULT_PAGES_DIR.to_string(),
            retry: RetryPolicy::default(),
            github: GithubConfig {
                api_url: DEFAULT_API_URL.to_string(),
                token: "t".to_string(),
                owner: "octo".to_string(),
                repo: "site".to_string(),
                commit_sha: "abc1234def".to_string(),
                base_branch: DEFAULT_BASE_BRANCH.to_string(),
            },
        }
    }

    #[test]
    fn sync_flags_include_target_alias() {
        let config = config_with_alias(Some("uat-sandbox"));
        assert_eq!(config.sync_flags(), vec!["--targetusername=uat-sandbox"]);
    }

    #[test]
    fn sync_flags_empty_without_alias() {
        let config = config_with_alias(None);
        assert!(config.sync_flags().is_empty());
    }

    #[test]
    fn pages_marker_appends_separator() {
        let config = config_with_alias(None);
        assert_eq!(config.pages_marker(), "skuidpages/");
    }

    #[test]
    fn retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }

    #[test]
    fn retry_policy_accepts_overrides() {
        let policy = parse_retry_policy(Some("5"), Some("2")).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }

    #[test]
    fn retry_policy_rejects_garbage() {
        let err = parse_retry_policy(Some("lots"), None).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["var"], "DEPLOY_MAX_RETRIES");
    }
}
