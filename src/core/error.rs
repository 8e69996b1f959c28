use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingVar,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    DeployNoChangedFiles,
    DeployNoPages,
    DeployRetriesExhausted,

    GithubRequestFailed,
    GithubUnexpectedStatus,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingVar => "config.missing_var",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::DeployNoChangedFiles => "deploy.no_changed_files",
            ErrorCode::DeployNoPages => "deploy.no_pages",
            ErrorCode::DeployRetriesExhausted => "deploy.retries_exhausted",

            ErrorCode::GithubRequestFailed => "github.request_failed",
            ErrorCode::GithubUnexpectedStatus => "github.unexpected_status",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetriesExhaustedDetails {
    pub page: String,
    pub attempts: u32,
    pub diagnostic: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn config_missing_var(var: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingVar,
            format!("Missing required environment variable {}", var),
            serde_json::json!({ "var": var }),
        )
        .with_hint(format!("Set {} in the CI job environment", var))
    }

    pub fn config_invalid_value(
        var: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            serde_json::json!({
                "var": var.into(),
                "value": value,
                "problem": problem.into(),
            }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = serde_json::to_value(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn no_changed_files() -> Self {
        Self::new(
            ErrorCode::DeployNoChangedFiles,
            "No changed files detected",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Populate ALL_CHANGED_FILES with the merge's changed paths")
    }

    pub fn no_pages_matched(marker: &str) -> Self {
        Self::new(
            ErrorCode::DeployNoPages,
            "No pages found to be deployed",
            serde_json::json!({ "marker": marker }),
        )
    }

    pub fn retries_exhausted(page: &str, attempts: u32, diagnostic: &str) -> Self {
        let details = serde_json::to_value(RetriesExhaustedDetails {
            page: page.to_string(),
            attempts,
            diagnostic: diagnostic.to_string(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::DeployRetriesExhausted,
            format!("Page {} could not be deployed after {} attempts", page, attempts),
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
