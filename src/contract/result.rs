//! Execution result contract.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal outcome of one execution. Closed set; no other states exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Process exited with code 0 within the timeout.
    Success,
    /// Process exited with a non-zero code (or was killed by an external
    /// signal) within the timeout.
    Failure,
    /// The timeout elapsed before exit; the process was forcibly killed.
    Timeout,
    /// The caller cancelled the invocation; the process was forcibly killed.
    Cancelled,
    /// The process could not be spawned, or an internal fault occurred.
    Error,
}

impl ExecutionStatus {
    /// Whether this status represents a zero exit code.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failure => "FAILURE",
            ExecutionStatus::Timeout => "TIMEOUT",
            ExecutionStatus::Cancelled => "CANCELLED",
            ExecutionStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Sentinel exit code when no OS return code is obtainable (spawn failure,
/// forced kill).
pub(crate) const NO_EXIT_CODE: i32 = -1;

/// Outcome of one [`crate::ExecutionCommand`], produced exactly once per
/// request.
///
/// All fields are assigned at resolution and never mutated afterwards.
/// Only the engine constructs results; callers read them. `error_message`
/// is `Some` for every non-`Success` status and `None` for `Success`.
///
/// `stdout` and `stderr` carry everything the process wrote up to
/// resolution, decoded as lossy UTF-8 and uncapped; callers that need a
/// size bound must enforce it downstream.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    status: ExecutionStatus,
    exit_code: i32,
    duration_s: f64,
    stdout: String,
    stderr: String,
    error_message: Option<String>,
    context_id: String,
}

impl ExecutionResult {
    /// Terminal status.
    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// OS return code, or `-1` when none was obtainable.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Wall-clock seconds from dispatch to resolution.
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// Captured standard output.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Diagnostic message; present exactly when `status != Success`.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Correlation id, copied verbatim from the originating request.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Shorthand for `status().is_success()`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub(crate) fn success(
        duration: Duration,
        stdout: String,
        stderr: String,
        context_id: String,
    ) -> Self {
        Self {
            status: ExecutionStatus::Success,
            exit_code: 0,
            duration_s: duration.as_secs_f64(),
            stdout,
            stderr,
            error_message: None,
            context_id,
        }
    }

    pub(crate) fn failure(
        exit_code: i32,
        message: String,
        duration: Duration,
        stdout: String,
        stderr: String,
        context_id: String,
    ) -> Self {
        Self {
            status: ExecutionStatus::Failure,
            exit_code,
            duration_s: duration.as_secs_f64(),
            stdout,
            stderr,
            error_message: Some(message),
            context_id,
        }
    }

    pub(crate) fn timeout(
        timeout_s: f64,
        duration: Duration,
        stdout: String,
        stderr: String,
        context_id: String,
    ) -> Self {
        Self {
            status: ExecutionStatus::Timeout,
            exit_code: NO_EXIT_CODE,
            duration_s: duration.as_secs_f64(),
            stdout,
            stderr,
            error_message: Some(format!(
                "command timed out after {timeout_s} seconds; process was killed"
            )),
            context_id,
        }
    }

    pub(crate) fn cancelled(
        duration: Duration,
        stdout: String,
        stderr: String,
        context_id: String,
    ) -> Self {
        Self {
            status: ExecutionStatus::Cancelled,
            exit_code: NO_EXIT_CODE,
            duration_s: duration.as_secs_f64(),
            stdout,
            stderr,
            error_message: Some("execution cancelled by caller; process was killed".to_string()),
            context_id,
        }
    }

    pub(crate) fn error(
        message: String,
        duration: Duration,
        stdout: String,
        stderr: String,
        context_id: String,
    ) -> Self {
        Self {
            status: ExecutionStatus::Error,
            exit_code: NO_EXIT_CODE,
            duration_s: duration.as_secs_f64(),
            stdout,
            stderr,
            error_message: Some(message),
            context_id,
        }
    }
}
