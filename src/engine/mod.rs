//! Execution Engine: process dispatch, timeout enforcement, stream capture
//! and outcome classification.

pub mod executor;
pub mod handle;
pub mod invocation;
pub mod registry;

pub use executor::ExecutionEngine;
pub use handle::ExecutionHandle;
pub use invocation::InvocationId;
pub use registry::ProcessRegistry;
