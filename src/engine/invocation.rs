//! Invocation identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for invocation ID generation.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one engine invocation.
///
/// IDs are generated from an atomic counter, unique within a process
/// lifetime, and displayed as `exec-XXXXXXXX` in hexadecimal. They identify
/// the invocation itself (for cancellation and registry bookkeeping), not
/// the caller's trace record; that is what the command's `context_id` is
/// for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(u64);

impl InvocationId {
    /// Create a new unique invocation ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Create an InvocationId from a raw u64 value.
    ///
    /// This is primarily for testing.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Parse an ID from its `exec-XXXXXXXX` display form.
    pub fn parse(s: &str) -> Option<Self> {
        s.strip_prefix("exec-")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .map(InvocationId)
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec-{:08x}", self.0)
    }
}
