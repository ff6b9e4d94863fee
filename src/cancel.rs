//! Cooperative cancellation (§6 "Interrupts"): a shared flag the MLE,
//! MCMC, and ARMS drivers poll once per outer iteration.
//!
//! The original relied on a process-wide `SIGINT` handler and a
//! `setjmp`/`longjmp` non-local escape out of the optimizer's inner loop.
//! Rust has neither signal-safe unwinding nor `longjmp`; the REDESIGN
//! FLAGS point toward a plain cancellation token instead, which also
//! composes with running a driver on a worker thread the caller can abort
//! independently of process-wide signal state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply cloneable flag a long-running driver polls for early exit.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches_after_cancel() {
        let tok = CancellationToken::new();
        assert!(!tok.is_cancelled());
        let clone = tok.clone();
        clone.cancel();
        assert!(tok.is_cancelled());
    }
}
