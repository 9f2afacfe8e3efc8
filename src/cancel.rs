//! Cooperative cancellation flag shared by debounce timers and retry loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap clonable cancellation token.
///
/// Every debounced refresh/reload and every bounded retry loop holds one of
/// these; collapsing a folder, closing the opened file or tearing down the
/// session flips the flag and the pending work aborts without mutating
/// anything.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether two tokens are the same underlying flag.
    ///
    /// Used by the debounce map to make sure a firing timer only clears the
    /// pending entry that still belongs to it, not a newer reschedule.
    pub fn same(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn same_distinguishes_tokens() {
        let a = CancelToken::new();
        let b = CancelToken::new();
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }
}
