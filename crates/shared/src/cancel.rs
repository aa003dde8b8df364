//! Cooperative cancellation for processing runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-run cancellation token, shared between the run's worker and whoever
/// controls it.
///
/// Cloning yields another handle to the same flag. The flag is the only piece
/// of run state shared across execution contexts; it is set once and never
/// reset, so a flag is never reused between runs.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
