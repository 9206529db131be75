//! Contract Model: the schemas crossing the engine boundary.
//!
//! [`ExecutionCommand`] is the input contract and can only be obtained
//! through its validating builder, so an instance is valid by construction.
//! [`ExecutionResult`] is the output contract and is only ever constructed
//! by the engine; callers read it.

pub mod command;
pub mod result;

pub use command::{ExecutionCommand, ExecutionCommandBuilder, DEFAULT_TIMEOUT_S};
pub use result::{ExecutionResult, ExecutionStatus};
