//! Error types for host-exec.
//!
//! Once a command has passed contract validation, every failure mode of the
//! engine resolves into an [`crate::ExecutionResult`] rather than an error.
//! The only faults that propagate to the caller as `Err` are contract
//! violations, reported before any process is spawned.

use thiserror::Error;

/// Contract validation failure.
///
/// Each variant names the first violated field, checked in declaration order
/// of the request contract: `command`, `args`, `timeout`, `env_vars`,
/// `context_id`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `command` is empty.
    #[error("command must not be empty")]
    EmptyCommand,

    /// `command` contains an embedded NUL byte.
    #[error("command contains an embedded NUL byte")]
    NulInCommand,

    /// An argument contains an embedded NUL byte.
    #[error("argument at index {index} contains an embedded NUL byte")]
    NulInArg {
        /// Position of the offending argument.
        index: usize,
    },

    /// `timeout` is not a positive, finite number of seconds representable
    /// as a duration.
    #[error("timeout must be a positive number of seconds within duration range, got {value}")]
    InvalidTimeout {
        /// The rejected value.
        value: f64,
    },

    /// An environment variable key is empty.
    #[error("environment variable keys must not be empty")]
    EmptyEnvKey,

    /// An environment variable key or value contains an embedded NUL byte.
    #[error("environment variable {key:?} contains an embedded NUL byte")]
    NulInEnv {
        /// The offending key.
        key: String,
    },

    /// `context_id` is empty.
    #[error("context_id must not be empty")]
    EmptyContextId,
}

/// Convenience Result type for host-exec operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
