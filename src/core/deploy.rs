use std::collections::VecDeque;
use std::process::Command;
use std::time::Duration;

use serde::Serialize;

use crate::config::RetryPolicy;
use crate::utils::command;

/// Why a push invocation failed, decided at the call site.
#[derive(Debug, Clone)]
pub enum PushError {
    /// The tool ran and exited non-zero; diagnostic is its stderr (stdout
    /// fallback).
    Execution { exit_code: i32, diagnostic: String },
    /// The tool could not be started at all.
    Launch { message: String },
}

impl PushError {
    pub fn diagnostic(&self) -> &str {
        match self {
            PushError::Execution { diagnostic, .. } => diagnostic,
            PushError::Launch { message } => message,
        }
    }
}

/// Pushes one page to the target platform.
///
/// Production uses the `sf` CLI; tests substitute fakes.
pub trait PagePusher {
    fn push(&self, page: &str, sync_flags: &[String]) -> std::result::Result<String, PushError>;
}

/// Pushes pages through `sf skuid page push`.
pub struct SfCli {
    pages_dir: String,
}

impl SfCli {
    pub fn new(pages_dir: impl Into<String>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
        }
    }
}

impl PagePusher for SfCli {
    fn push(&self, page: &str, sync_flags: &[String]) -> std::result::Result<String, PushError> {
        let page_path = format!("./{}/{}", self.pages_dir, page);

        let output = Command::new("sf")
            .args(["skuid", "page", "push"])
            .args(sync_flags)
            .arg(&page_path)
            .output()
            .map_err(|e| PushError::Launch {
                message: format!("Failed to run sf: {}", e),
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(PushError::Execution {
                exit_code: command::exit_code(&output),
                diagnostic: command::error_text(&output),
            })
        }
    }
}

/// Pause between retry attempts.
pub trait Backoff {
    fn pause(&mut self, delay: Duration);
}

/// Production backoff: block the thread for the configured delay.
pub struct ThreadBackoff;

impl Backoff for ThreadBackoff {
    fn pause(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// One unit of deployment work. Created on enqueue, mutated only by the
/// deployer, removed from the queue once its outcome is no longer Pending.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentTask {
    pub page: String,
    pub attempts: u32,
    pub outcome: TaskOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DeploymentTask {
    fn new(page: String) -> Self {
        Self {
            page,
            attempts: 0,
            outcome: TaskOutcome::Pending,
            last_error: None,
        }
    }
}

/// FIFO work list for one deployment run.
///
/// Owned by a single deployer for the duration of one batch; never reused
/// across runs.
#[derive(Debug, Default)]
pub struct DeploymentQueue {
    tasks: VecDeque<DeploymentTask>,
}

impl DeploymentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append pages to the tail in input order.
    pub fn enqueue<I>(&mut self, pages: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.tasks.extend(pages.into_iter().map(DeploymentTask::new));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn pop(&mut self) -> Option<DeploymentTask> {
        self.tasks.pop_front()
    }
}

/// Outcome of draining one batch.
///
/// A failed batch is a value the caller inspects, not an unwind: the gate
/// decides whether compensation runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed {
        deployed: Vec<String>,
    },
    Failed {
        page: String,
        attempts: u32,
        diagnostic: String,
        deployed: Vec<String>,
    },
}

impl BatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchOutcome::Failed { .. })
    }
}

/// Deploys queued pages in order with bounded per-page retry.
pub struct Deployer<P, B = ThreadBackoff> {
    pusher: P,
    policy: RetryPolicy,
    backoff: B,
}

impl<P: PagePusher> Deployer<P, ThreadBackoff> {
    pub fn new(pusher: P, policy: RetryPolicy) -> Self {
        Self {
            pusher,
            policy,
            backoff: ThreadBackoff,
        }
    }
}

impl<P: PagePusher, B: Backoff> Deployer<P, B> {
    pub fn with_backoff(pusher: P, policy: RetryPolicy, backoff: B) -> Self {
        Self {
            pusher,
            policy,
            backoff,
        }
    }

    /// Push one page, retrying up to the policy limit with a constant delay
    /// between attempts.
    ///
    /// Exhaustion marks the task Failed and returns false; individual push
    /// failures never surface past this method.
    pub fn deploy_one(&mut self, task: &mut DeploymentTask, sync_flags: &[String]) -> bool {
        while task.attempts < self.policy.max_attempts {
            eprintln!("[deploy] Pushing page: {}", task.page);
            match self.pusher.push(&task.page, sync_flags) {
                Ok(stdout) => {
                    if !stdout.is_empty() {
                        eprintln!("[deploy] {}", stdout);
                    }
                    task.outcome = TaskOutcome::Succeeded;
                    return true;
                }
                Err(err) => {
                    task.attempts += 1;
                    task.last_error = Some(err.diagnostic().to_string());
                    eprintln!(
                        "[deploy] Push failed for {}: {}",
                        task.page,
                        err.diagnostic()
                    );
                    if task.attempts < self.policy.max_attempts {
                        eprintln!(
                            "[deploy] Retrying {} ({}/{})",
                            task.page, task.attempts, self.policy.max_attempts
                        );
                        self.backoff.pause(self.policy.backoff);
                    }
                }
            }
        }

        task.outcome = TaskOutcome::Failed;
        false
    }

    /// Drain the queue strictly FIFO.
    ///
    /// Fail-fast: the first page that exhausts its retries aborts the batch
    /// immediately; remaining pages are never attempted. The deployed state
    /// may already be partially inconsistent at that point, and pushing more
    /// pages would compound it.
    pub fn drain(&mut self, mut queue: DeploymentQueue, sync_flags: &[String]) -> BatchOutcome {
        let mut deployed = Vec::new();

        while let Some(mut task) = queue.pop() {
            if self.deploy_one(&mut task, sync_flags) {
                deployed.push(task.page);
            } else {
                eprintln!(
                    "[deploy] Failed to deploy {} after {} attempts",
                    task.page, task.attempts
                );
                return BatchOutcome::Failed {
                    page: task.page,
                    attempts: task.attempts,
                    diagnostic: task.last_error.unwrap_or_default(),
                    deployed,
                };
            }
        }

        BatchOutcome::Completed { deployed }
    }
}
