//! Async invocation handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::registry::CancelFlag;
use super::InvocationId;
use crate::contract::ExecutionResult;

/// Handle to an in-flight asynchronous invocation.
///
/// Returned by [`crate::ExecutionEngine::run_async`]. The caller may await
/// the result with [`wait`](Self::wait), or request early termination with
/// [`cancel`](Self::cancel) at any point before resolution.
#[derive(Debug)]
pub struct ExecutionHandle {
    id: InvocationId,
    context_id: String,
    cancel: Arc<CancelFlag>,
    join: JoinHandle<ExecutionResult>,
}

impl ExecutionHandle {
    pub(crate) fn new(
        id: InvocationId,
        context_id: String,
        cancel: Arc<CancelFlag>,
        join: JoinHandle<ExecutionResult>,
    ) -> Self {
        Self {
            id,
            context_id,
            cancel,
            join,
        }
    }

    /// The invocation this handle tracks.
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// The `context_id` of the originating command.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Request cancellation.
    ///
    /// The invocation kills its process and resolves with
    /// [`ExecutionStatus::Cancelled`](crate::ExecutionStatus::Cancelled).
    /// Cancelling after resolution is a no-op: natural exit always wins the
    /// race, so a process that already finished keeps its real outcome.
    pub fn cancel(&self) {
        self.cancel.set();
    }

    /// Whether the invocation has already resolved.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Await resolution and consume the handle.
    ///
    /// Always yields a result: if the invocation worker itself failed (a
    /// panic, an internal fault), the outcome is an `Error` result carrying
    /// the original `context_id` rather than a propagated fault.
    pub async fn wait(self) -> ExecutionResult {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(invocation = %self.id, error = %e, "invocation worker failed");
                ExecutionResult::error(
                    format!("invocation worker failed: {e}"),
                    Duration::ZERO,
                    String::new(),
                    String::new(),
                    self.context_id,
                )
            }
        }
    }
}
