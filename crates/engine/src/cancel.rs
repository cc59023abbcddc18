//! Caller-supplied cooperative cancellation.

use crate::error::{ErrorKind, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable cancellation flag.
///
/// Pipelines poll the token at their suspension points (between I/O steps,
/// per restored entry). Cancellation is cooperative and never rolls back:
/// a cancelled restore leaves already-written files in place, and a
/// cancelled commit stops before the commit record is persisted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, repeatedly.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Raise [`Cancelled`](ErrorKind::Cancelled) if cancellation was
    /// requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            exn::bail!(ErrorKind::Cancelled);
        }
        Ok(())
    }
}
