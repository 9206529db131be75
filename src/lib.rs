//! # host-exec
//!
//! Contract-bound host command execution core.
//!
//! This crate executes local processes under a strict input/output schema:
//! a caller builds a validated [`ExecutionCommand`], hands it to the
//! [`ExecutionEngine`], and receives exactly one [`ExecutionResult`] with a
//! closed set of terminal statuses. Failures of the command itself (non-zero
//! exit, timeout, spawn error) are data in the result, never propagated
//! faults; only contract violations are reported as errors, before any
//! process is spawned.
//!
//! ## Features
//!
//! - **Validated contracts**: commands cannot exist in an invalid state
//! - **Timeout enforcement**: every command carries a wall-clock bound;
//!   expired processes are killed, process group and all
//! - **Continuous capture**: stdout/stderr drained while the process runs,
//!   so full pipes never deadlock an invocation
//! - **Sync and async dispatch**: identical semantics, plus cancellation
//!   through the async handle
//!
//! ## Quick Start
//!
//! ```no_run
//! use host_exec::{ExecutionCommand, ExecutionEngine};
//!
//! #[tokio::main]
//! async fn main() -> host_exec::Result<()> {
//!     // Initialize logging
//!     host_exec::logging::try_init().ok();
//!
//!     let engine = ExecutionEngine::new();
//!
//!     let command = ExecutionCommand::builder("echo")
//!         .arg("hello")
//!         .timeout_secs(5.0)
//!         .context_id("quickstart-1")
//!         .build()?;
//!
//!     let result = engine.run_async(command).wait().await;
//!     println!("{} exit={} stdout={}", result.status(), result.exit_code(), result.stdout());
//!
//!     Ok(())
//! }
//! ```

pub mod contract;
pub mod engine;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use contract::{
    ExecutionCommand, ExecutionCommandBuilder, ExecutionResult, ExecutionStatus, DEFAULT_TIMEOUT_S,
};
pub use engine::{ExecutionEngine, ExecutionHandle, InvocationId, ProcessRegistry};
pub use error::{Result, ValidationError};
