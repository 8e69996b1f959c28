//! Command execution primitives with consistent error handling.

use std::process::Output;

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

/// Exit code of a finished process, treating signal death as failure.
pub fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_prefers_stderr() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"stderr content".to_vec(),
        };
        assert_eq!(error_text(&output), "stderr content");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"".to_vec(),
        };
        assert_eq!(error_text(&output), "stdout content");
    }
}
