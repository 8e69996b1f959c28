//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use pagegate::error::Hint;
use pagegate::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
                retryable: err.retryable,
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingVar
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::DeployNoChangedFiles
        | ErrorCode::DeployNoPages => 2,

        ErrorCode::DeployRetriesExhausted => 20,

        ErrorCode::GithubRequestFailed | ErrorCode::GithubUnexpectedStatus => 30,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_validation_exit_code() {
        assert_eq!(exit_code_for_error(ErrorCode::ConfigMissingVar), 2);
        assert_eq!(exit_code_for_error(ErrorCode::DeployNoChangedFiles), 2);
        assert_eq!(exit_code_for_error(ErrorCode::DeployNoPages), 2);
    }

    #[test]
    fn deploy_and_github_errors_have_distinct_exit_codes() {
        assert_eq!(exit_code_for_error(ErrorCode::DeployRetriesExhausted), 20);
        assert_eq!(exit_code_for_error(ErrorCode::GithubUnexpectedStatus), 30);
    }

    #[test]
    fn error_envelope_carries_code_and_details() {
        let err = Error::no_pages_matched("skuidpages/");
        let response = CliResponse::<()>::from_error(&err);
        assert!(!response.success);

        let cli_error = response.error.unwrap();
        assert_eq!(cli_error.code, "deploy.no_pages");
        assert_eq!(cli_error.details["marker"], "skuidpages/");
    }
}
