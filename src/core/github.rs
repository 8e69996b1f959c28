//! GitHub REST client for the revert workflow.
//!
//! Thin blocking wrapper over the five endpoints the compensating
//! transaction needs. There is no local retry here: any unexpected status
//! is fatal and carries the raw response body, because this path is itself
//! the last line of defense.

use reqwest::blocking::{Client, Response};
use serde_json::{json, Value};

use crate::config::GithubConfig;
use crate::error::{Error, ErrorCode, Result};
use crate::revert::RevertRemote;

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("pagegate/", env!("CARGO_PKG_VERSION"));

fn http_error(step: &str, e: reqwest::Error) -> Error {
    Error::new(
        ErrorCode::GithubRequestFailed,
        format!("GitHub request failed during {}: {}", step, e),
        json!({ "step": step, "error": e.to_string() }),
    )
}

fn api_error(step: &str, action: &str, status: u16, body: &str) -> Error {
    Error::new(
        ErrorCode::GithubUnexpectedStatus,
        format!("Failed to {}: {}", action, body),
        json!({ "step": step, "status": status, "body": body }),
    )
}

fn missing_field_error(step: &str, path: &[&str]) -> Error {
    Error::internal_json(
        format!(
            "GitHub response for {} is missing field '{}'",
            step,
            path.join(".")
        ),
        Some(step.to_string()),
    )
}

/// A merge commit as fetched from the remote API. Never mutated locally;
/// the revert workflow only reads it and derives new objects.
#[derive(Debug, Clone)]
pub struct MergeCommit {
    pub sha: String,
    pub message: String,
    pub tree_sha: String,
}

pub struct GithubClient {
    client: Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, path
        )
    }

    /// GET a resource, expecting 200.
    fn get(&self, path: &str, step: &str, action: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
            .send()
            .map_err(|e| http_error(step, e))?;

        expect_status(response, 200, step, action)
    }

    /// POST a JSON body, expecting 201.
    fn post(&self, path: &str, body: &Value, step: &str, action: &str) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
            .json(body)
            .send()
            .map_err(|e| http_error(step, e))?;

        expect_status(response, 201, step, action)
    }
}

impl RevertRemote for GithubClient {
    fn commit(&self, sha: &str) -> Result<MergeCommit> {
        let value = self.get(
            &format!("commits/{}", sha),
            "get commit",
            "get commit details",
        )?;
        parse_merge_commit(&value)
    }

    fn branch_tip(&self, branch: &str) -> Result<String> {
        let value = self.get(
            &format!("git/ref/heads/{}", branch),
            "get branch ref",
            "get branch details",
        )?;
        string_at(&value, &["object", "sha"], "get branch ref")
    }

    fn create_branch(&self, name: &str, sha: &str) -> Result<()> {
        let body = json!({
            "ref": format!("refs/heads/{}", name),
            "sha": sha,
        });
        self.post("git/refs", &body, "create branch", "create branch")?;
        Ok(())
    }

    fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str) -> Result<String> {
        let body = json!({
            "message": message,
            "parents": [parent_sha],
            "tree": tree_sha,
        });
        let value = self.post(
            "git/commits",
            &body,
            "create commit",
            "create revert commit",
        )?;
        string_at(&value, &["sha"], "create commit")
    }

    fn open_pull_request(&self, title: &str, head: &str, base: &str, body: &str) -> Result<String> {
        let payload = json!({
            "title": title,
            "head": head,
            "base": base,
            "body": body,
        });
        let value = self.post(
            "pulls",
            &payload,
            "create pull request",
            "create pull request",
        )?;
        string_at(&value, &["html_url"], "create pull request")
    }
}

fn expect_status(response: Response, expected: u16, step: &str, action: &str) -> Result<Value> {
    let status = response.status().as_u16();
    let body = response.text().map_err(|e| http_error(step, e))?;

    if status != expected {
        return Err(api_error(step, action, status, &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| Error::internal_json(e.to_string(), Some(step.to_string())))
}

fn parse_merge_commit(value: &Value) -> Result<MergeCommit> {
    Ok(MergeCommit {
        sha: string_at(value, &["sha"], "get commit")?,
        message: string_at(value, &["commit", "message"], "get commit")?,
        tree_sha: string_at(value, &["commit", "tree", "sha"], "get commit")?,
    })
}

/// Walk nested object keys and return the string found there.
fn string_at(value: &Value, path: &[&str], step: &str) -> Result<String> {
    let mut current = value;
    for key in path {
        current = current
            .get(key)
            .ok_or_else(|| missing_field_error(step, path))?;
    }
    current
        .as_str()
        .map(String::from)
        .ok_or_else(|| missing_field_error(step, path))
}
