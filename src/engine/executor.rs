//! The execution engine: dispatches validated commands and resolves them
//! into results.

use std::io::Read;
use std::process::{Child, Command as OsCommand, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::handle::ExecutionHandle;
use super::registry::{CancelFlag, ProcessRegistry};
use super::InvocationId;
use crate::contract::result::NO_EXIT_CODE;
use crate::contract::{ExecutionCommand, ExecutionResult};

/// Poll period for exit/cancel/timeout checks while a process runs.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Buffer size for draining process output streams.
const READ_BUFFER_SIZE: usize = 4096;

/// Executes validated [`ExecutionCommand`]s and produces exactly one
/// [`ExecutionResult`] per command.
///
/// Invocations are fully independent: each owns its process, reader threads
/// and timeout clock. The only engine-wide state is the
/// [`ProcessRegistry`], which tracks in-flight invocations to support
/// cancellation. The engine never retains commands or results after
/// resolution, and an invocation that hits an internal fault leaves the
/// engine fully usable for subsequent calls.
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    registry: Arc<ProcessRegistry>,
}

impl ExecutionEngine {
    /// Create a new engine with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a command, blocking the calling thread until resolution.
    ///
    /// Command outcomes (non-zero exit, timeout, spawn failure) are encoded
    /// in the result's status, never raised.
    pub fn run_sync(&self, command: ExecutionCommand) -> ExecutionResult {
        let id = InvocationId::new();
        let cancel = Arc::new(CancelFlag::default());
        self.registry.insert(id, Arc::clone(&cancel));
        run_invocation(id, &command, &cancel, &self.registry)
    }

    /// Schedule a command without blocking the caller.
    ///
    /// Returns immediately with a handle that resolves to the identical
    /// result `run_sync` would have produced for the same input. Must be
    /// called within a tokio runtime; the invocation runs on the blocking
    /// thread pool.
    pub fn run_async(&self, command: ExecutionCommand) -> ExecutionHandle {
        let id = InvocationId::new();
        let cancel = Arc::new(CancelFlag::default());
        let context_id = command.context_id().to_string();

        // Register on the caller's thread, before the worker is scheduled:
        // the id returned in the handle must be cancellable through the
        // registry from the moment it is visible.
        self.registry.insert(id, Arc::clone(&cancel));

        let worker_cancel = Arc::clone(&cancel);
        let registry = Arc::clone(&self.registry);
        let join = tokio::task::spawn_blocking(move || {
            run_invocation(id, &command, &worker_cancel, &registry)
        });

        ExecutionHandle::new(id, context_id, cancel, join)
    }

    /// Request cancellation of an in-flight invocation by id.
    ///
    /// Invocations are registered before `run_sync` starts and before
    /// `run_async` returns, so this works from the moment an id is
    /// visible. Returns `false` once the invocation has resolved (or for
    /// an unknown id). Callers holding an [`ExecutionHandle`] can cancel
    /// through it directly instead.
    pub fn cancel(&self, id: InvocationId) -> bool {
        self.registry.cancel(&id)
    }

    /// Number of invocations currently in flight.
    pub fn active_count(&self) -> usize {
        self.registry.count()
    }

    /// The engine's in-flight invocation registry.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }
}

/// How one invocation left its polling loop.
enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
    WaitFailed(std::io::Error),
}

/// Run one registered command to resolution.
///
/// The dispatching caller has already placed the invocation in the
/// registry; this routine deregisters it on every path. Shared by
/// `run_sync` and `run_async`, so both entry points have identical
/// semantics by construction.
fn run_invocation(
    id: InvocationId,
    command: &ExecutionCommand,
    cancel: &Arc<CancelFlag>,
    registry: &ProcessRegistry,
) -> ExecutionResult {
    let result = execute(id, command, cancel, registry);
    registry.remove(&id);
    debug!(
        invocation = %id,
        context_id = %result.context_id(),
        status = %result.status(),
        exit_code = result.exit_code(),
        duration_s = result.duration_s(),
        "invocation resolved"
    );
    result
}

fn execute(
    id: InvocationId,
    command: &ExecutionCommand,
    cancel: &Arc<CancelFlag>,
    registry: &ProcessRegistry,
) -> ExecutionResult {
    let start = Instant::now();
    let context_id = command.context_id().to_string();

    debug!(
        invocation = %id,
        context_id = %context_id,
        command = command.command(),
        "dispatching command"
    );

    // cwd must exist and be a directory at dispatch time; no process is
    // created otherwise.
    if let Some(dir) = command.cwd() {
        if !dir.is_dir() {
            return ExecutionResult::error(
                format!(
                    "working directory {} does not exist or is not a directory",
                    dir.display()
                ),
                start.elapsed(),
                String::new(),
                String::new(),
                context_id,
            );
        }
    }

    // A cancel can land before the worker even starts; honor it without
    // creating a process.
    if cancel.is_set() {
        return ExecutionResult::cancelled(
            start.elapsed(),
            String::new(),
            String::new(),
            context_id,
        );
    }

    let mut proc = OsCommand::new(command.command());
    proc.args(command.args())
        // Overlay on the inherited environment: per-key overwrite, the
        // parent's own environment is never touched.
        .envs(command.env_vars())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = command.cwd() {
        proc.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a kill reaches descendants too.
        proc.process_group(0);
    }

    let mut child = match proc.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecutionResult::error(
                format!("failed to spawn {:?}: {e}", command.command()),
                start.elapsed(),
                String::new(),
                String::new(),
                context_id,
            );
        }
    };
    registry.set_pid(&id, child.id());

    // Drain both streams continuously while the process runs. Reading only
    // after exit would deadlock on processes that fill a pipe buffer.
    let stdout_drain = spawn_drain(child.stdout.take());
    let stderr_drain = spawn_drain(child.stderr.take());

    // The timeout clock starts at spawn, not at dispatch.
    let spawned = Instant::now();
    let timeout = command.timeout();

    let outcome = loop {
        // Sample exit status first: a natural exit observed at the same
        // instant the timeout (or a cancel) fires still counts as a
        // natural exit.
        match child.try_wait() {
            Ok(Some(status)) => break Outcome::Exited(status),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child);
                break Outcome::WaitFailed(e);
            }
        }
        if cancel.is_set() {
            kill_and_reap(&mut child);
            break Outcome::Cancelled;
        }
        if spawned.elapsed() >= timeout {
            kill_and_reap(&mut child);
            break Outcome::TimedOut;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_drain(stdout_drain);
    let stderr = join_drain(stderr_drain);
    let duration = start.elapsed();

    match outcome {
        Outcome::Exited(status) => {
            // A stream read fault on an otherwise clean run is an internal
            // error; killed paths keep their own status regardless.
            if let Some(e) = stdout.error.as_ref().or(stderr.error.as_ref()) {
                ExecutionResult::error(
                    format!("failed to read process output: {e}"),
                    duration,
                    stdout.text(),
                    stderr.text(),
                    context_id,
                )
            } else {
                classify_exit(status, duration, stdout.text(), stderr.text(), context_id)
            }
        }
        Outcome::TimedOut => ExecutionResult::timeout(
            command.timeout_s(),
            duration,
            stdout.text(),
            stderr.text(),
            context_id,
        ),
        Outcome::Cancelled => {
            ExecutionResult::cancelled(duration, stdout.text(), stderr.text(), context_id)
        }
        Outcome::WaitFailed(e) => ExecutionResult::error(
            format!("failed to poll process status: {e}"),
            duration,
            stdout.text(),
            stderr.text(),
            context_id,
        ),
    }
}

fn classify_exit(
    status: ExitStatus,
    duration: Duration,
    stdout: String,
    stderr: String,
    context_id: String,
) -> ExecutionResult {
    match status.code() {
        Some(0) => ExecutionResult::success(duration, stdout, stderr, context_id),
        Some(code) => ExecutionResult::failure(
            code,
            format!("command exited with non-zero code {code}"),
            duration,
            stdout,
            stderr,
            context_id,
        ),
        // No exit code: the process was taken down by an external signal.
        None => ExecutionResult::failure(
            NO_EXIT_CODE,
            signal_message(&status),
            duration,
            stdout,
            stderr,
            context_id,
        ),
    }
}

#[cfg(unix)]
fn signal_message(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("command terminated by signal {signal}"),
        None => "command terminated without an exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn signal_message(_status: &ExitStatus) -> String {
    "command terminated without an exit code".to_string()
}

/// Forcibly terminate the process and reap it so nothing is orphaned.
fn kill_and_reap(child: &mut Child) {
    #[cfg(unix)]
    {
        // The child leads its own process group; SIGKILL the group so
        // descendants go down with it. Fall back to the child alone if the
        // group is already gone.
        let pgid = child.id() as i32;
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc != 0 {
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Output captured from one stream, plus any read fault encountered.
struct Captured {
    bytes: Vec<u8>,
    error: Option<std::io::Error>,
}

impl Captured {
    fn empty() -> Self {
        Self {
            bytes: Vec::new(),
            error: None,
        }
    }

    /// Lossy UTF-8 decode of everything captured. Uncapped.
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

fn spawn_drain<R>(stream: Option<R>) -> Option<thread::JoinHandle<Captured>>
where
    R: Read + Send + 'static,
{
    stream.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let mut buf = [0u8; READ_BUFFER_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break Captured { bytes, error: None },
                    Ok(n) => bytes.extend_from_slice(&buf[..n]),
                    Err(e) => {
                        break Captured {
                            bytes,
                            error: Some(e),
                        }
                    }
                }
            }
        })
    })
}

fn join_drain(handle: Option<thread::JoinHandle<Captured>>) -> Captured {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_else(Captured::empty)
}
