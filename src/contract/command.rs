//! Execution request contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Timeout applied when a caller does not set one explicitly, in seconds.
pub const DEFAULT_TIMEOUT_S: f64 = 300.0;

/// A fully specified request to execute one host command.
///
/// Instances are immutable and always contract-valid: the only way to
/// construct one is [`ExecutionCommandBuilder::build`], which checks every
/// invariant first (validate-then-construct). Deserialization goes through
/// the same path, so wire data cannot produce an invalid command either.
///
/// Arguments are passed to the process verbatim; no shell is involved and
/// no quoting or re-interpretation is performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExecutionCommandBuilder")]
pub struct ExecutionCommand {
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: f64,
    env_vars: HashMap<String, String>,
    context_id: String,
}

impl ExecutionCommand {
    /// Start building a command for the given executable name or path.
    pub fn builder(command: impl Into<String>) -> ExecutionCommandBuilder {
        ExecutionCommandBuilder::new(command)
    }

    /// Executable name or path, resolved via the process environment's
    /// search rules at dispatch time.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Ordered arguments, passed verbatim.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Working directory override, if any. When absent the spawned process
    /// inherits the caller's current directory.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Wall-clock execution bound in seconds. Always positive, finite, and
    /// representable as a [`Duration`].
    pub fn timeout_s(&self) -> f64 {
        self.timeout
    }

    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Environment overlay: applied on top of the inherited environment,
    /// per-key overwrite. Never replaces the whole environment.
    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }

    /// Caller-supplied opaque correlation id. Propagated verbatim into the
    /// result; the engine never interprets its content.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }
}

/// Builder for [`ExecutionCommand`].
///
/// Accumulates unvalidated fields; [`build`](Self::build) runs the full
/// contract check and either constructs the command or reports the first
/// violated field.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionCommandBuilder {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    cwd: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    timeout: f64,
    #[serde(default)]
    env_vars: HashMap<String, String>,
    #[serde(default)]
    context_id: String,
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_S
}

impl ExecutionCommandBuilder {
    /// Create a builder for the given executable.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            timeout: DEFAULT_TIMEOUT_S,
            env_vars: HashMap::new(),
            context_id: String::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set the execution timeout in seconds.
    pub fn timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the execution timeout from a [`Duration`].
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration.as_secs_f64();
        self
    }

    /// Add an environment variable to the overlay.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables to the overlay.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env_vars.insert(k.into(), v.into());
        }
        self
    }

    /// Set the correlation id.
    pub fn context_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = id.into();
        self
    }

    /// Validate every invariant and construct the command.
    ///
    /// Fields are checked in contract order: `command`, `args`, `timeout`,
    /// `env_vars`, `context_id`. The first violation wins; no partially
    /// valid command is ever constructed. Validation is a pure function of
    /// the field values, so repeating it yields the same outcome.
    pub fn build(self) -> Result<ExecutionCommand, ValidationError> {
        if self.command.is_empty() {
            return Err(ValidationError::EmptyCommand);
        }
        if self.command.contains('\0') {
            return Err(ValidationError::NulInCommand);
        }
        if let Some(index) = self.args.iter().position(|a| a.contains('\0')) {
            return Err(ValidationError::NulInArg { index });
        }
        // Positivity alone is not enough: a finite value can still overflow
        // what a Duration can hold, which would panic at dispatch time.
        if !self.timeout.is_finite()
            || self.timeout <= 0.0
            || Duration::try_from_secs_f64(self.timeout).is_err()
        {
            return Err(ValidationError::InvalidTimeout {
                value: self.timeout,
            });
        }
        for (key, value) in &self.env_vars {
            if key.is_empty() {
                return Err(ValidationError::EmptyEnvKey);
            }
            if key.contains('\0') || value.contains('\0') {
                return Err(ValidationError::NulInEnv { key: key.clone() });
            }
        }
        if self.context_id.is_empty() {
            return Err(ValidationError::EmptyContextId);
        }

        Ok(ExecutionCommand {
            command: self.command,
            args: self.args,
            cwd: self.cwd,
            timeout: self.timeout,
            env_vars: self.env_vars,
            context_id: self.context_id,
        })
    }
}

impl TryFrom<ExecutionCommandBuilder> for ExecutionCommand {
    type Error = ValidationError;

    fn try_from(builder: ExecutionCommandBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ExecutionCommandBuilder {
        ExecutionCommand::builder("echo").context_id("ctx-1")
    }

    #[test]
    fn test_builder_minimal() {
        let cmd = valid().build().unwrap();
        assert_eq!(cmd.command(), "echo");
        assert!(cmd.args().is_empty());
        assert!(cmd.cwd().is_none());
        assert_eq!(cmd.timeout_s(), DEFAULT_TIMEOUT_S);
        assert!(cmd.env_vars().is_empty());
        assert_eq!(cmd.context_id(), "ctx-1");
    }

    #[test]
    fn test_builder_full_chain() {
        let cmd = ExecutionCommand::builder("cargo")
            .arg("build")
            .args(["--release", "--quiet"])
            .cwd("/project")
            .timeout_secs(60.0)
            .env("RUST_LOG", "debug")
            .envs([("KEY1", "val1"), ("KEY2", "val2")])
            .context_id("ctx-build-7")
            .build()
            .unwrap();

        assert_eq!(cmd.args(), ["build", "--release", "--quiet"]);
        assert_eq!(cmd.cwd(), Some(Path::new("/project")));
        assert_eq!(cmd.timeout(), Duration::from_secs(60));
        assert_eq!(cmd.env_vars().len(), 3);
        assert_eq!(
            cmd.env_vars().get("RUST_LOG"),
            Some(&"debug".to_string())
        );
    }

    #[test]
    fn test_reject_empty_command() {
        let err = ExecutionCommand::builder("")
            .context_id("ctx")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyCommand);
    }

    #[test]
    fn test_reject_nul_in_command() {
        let err = ExecutionCommand::builder("ec\0ho")
            .context_id("ctx")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::NulInCommand);
    }

    #[test]
    fn test_reject_nul_in_arg() {
        let err = valid().arg("ok").arg("bad\0arg").build().unwrap_err();
        assert_eq!(err, ValidationError::NulInArg { index: 1 });
    }

    #[test]
    fn test_reject_non_positive_timeout() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = valid().timeout_secs(bad).build().unwrap_err();
            assert!(matches!(err, ValidationError::InvalidTimeout { .. }));
        }
    }

    #[test]
    fn test_reject_timeout_beyond_duration_range() {
        // Finite and positive, but not representable as a Duration; must be
        // rejected at the contract boundary, not blow up at dispatch.
        for huge in [1e300, f64::MAX] {
            let err = valid().timeout_secs(huge).build().unwrap_err();
            assert!(matches!(err, ValidationError::InvalidTimeout { .. }));
        }
    }

    #[test]
    fn test_accepts_large_representable_timeout() {
        let cmd = valid().timeout_secs(1e9).build().unwrap();
        assert_eq!(cmd.timeout(), Duration::from_secs(1_000_000_000));
    }

    #[test]
    fn test_reject_empty_env_key() {
        let err = valid().env("", "value").build().unwrap_err();
        assert_eq!(err, ValidationError::EmptyEnvKey);
    }

    #[test]
    fn test_reject_nul_in_env_value() {
        let err = valid().env("KEY", "va\0lue").build().unwrap_err();
        assert_eq!(err, ValidationError::NulInEnv { key: "KEY".into() });
    }

    #[test]
    fn test_reject_missing_context_id() {
        let err = ExecutionCommand::builder("echo").build().unwrap_err();
        assert_eq!(err, ValidationError::EmptyContextId);
    }

    #[test]
    fn test_first_violation_wins() {
        // Both command and timeout are invalid; command is checked first.
        let err = ExecutionCommand::builder("")
            .timeout_secs(-5.0)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyCommand);
    }

    #[test]
    fn test_validation_idempotent() {
        let make = || valid().timeout_secs(2.5).arg("hello");
        assert_eq!(make().build().unwrap(), make().build().unwrap());

        let make_bad = || valid().timeout_secs(-1.0);
        assert_eq!(
            make_bad().build().unwrap_err(),
            make_bad().build().unwrap_err()
        );
    }

    #[test]
    fn test_deserialize_valid() {
        let cmd: ExecutionCommand = serde_json::from_str(
            r#"{
                "command": "sleep",
                "args": ["10"],
                "timeout": 1.0,
                "context_id": "T3"
            }"#,
        )
        .unwrap();

        assert_eq!(cmd.command(), "sleep");
        assert_eq!(cmd.args(), ["10"]);
        assert_eq!(cmd.timeout_s(), 1.0);
        assert_eq!(cmd.context_id(), "T3");
    }

    #[test]
    fn test_deserialize_rejects_invalid_timeout() {
        let result = serde_json::from_str::<ExecutionCommand>(
            r#"{"command": "true", "timeout": -1.0, "context_id": "T"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_missing_context_id() {
        let result =
            serde_json::from_str::<ExecutionCommand>(r#"{"command": "true", "timeout": 5.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let cmd = valid().arg("x").timeout_secs(5.0).build().unwrap();
        let json = serde_json::to_string(&cmd).unwrap();
        let back: ExecutionCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }
}
