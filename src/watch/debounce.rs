//! Per-path map of pending debounce cancellation tokens.
//!
//! Plain data structure, no locking of its own: the owner (watch registry or
//! opened-file monitor) keeps it inside the same mutex as its watch handles
//! so cancel-previous-and-reschedule is atomic with respect to concurrent
//! events on the same path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;

/// At most one live (scheduled-or-running) entry per path at any time;
/// a superseded entry is cancelled, never queued behind the new one.
#[derive(Debug, Default)]
pub struct DebounceMap {
    pending: HashMap<PathBuf, CancelToken>,
}

impl DebounceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer for `path` and register a fresh token for the
    /// caller to arm a new timer with.
    pub fn reschedule(&mut self, path: &Path) -> CancelToken {
        let token = CancelToken::new();
        if let Some(previous) = self.pending.insert(path.to_path_buf(), token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel and forget the pending timer for `path`, if any.
    pub fn cancel(&mut self, path: &Path) {
        if let Some(token) = self.pending.remove(path) {
            token.cancel();
        }
    }

    /// Cancel everything. Used on teardown.
    pub fn cancel_all(&mut self) {
        for (_, token) in self.pending.drain() {
            token.cancel();
        }
    }

    /// Drop the entry for `path` if it still belongs to `token`, returning
    /// whether it did.
    ///
    /// An entry covers the whole scheduled-and-running lifetime of its timer:
    /// the timer calls this only after its work completes, and publishes only
    /// when it still owned the entry. A reschedule that happened mid-run has
    /// already cancelled the token and replaced the entry, so this returns
    /// `false` and the superseded run stays silent.
    pub fn clear_if_current(&mut self, path: &Path, token: &CancelToken) -> bool {
        if self.pending.get(path).is_some_and(|t| t.same(token)) {
            self.pending.remove(path);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reschedule_cancels_previous_token() {
        let mut map = DebounceMap::new();
        let first = map.reschedule(Path::new("/a"));
        let second = map.reschedule(Path::new("/a"));
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn clear_if_current_ignores_superseded_tokens() {
        let mut map = DebounceMap::new();
        let stale = map.reschedule(Path::new("/a"));
        let live = map.reschedule(Path::new("/a"));

        assert!(!map.clear_if_current(Path::new("/a"), &stale));
        assert_eq!(map.len(), 1, "stale timer must not clear the live entry");

        assert!(map.clear_if_current(Path::new("/a"), &live));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn reschedule_during_a_running_refresh_cancels_it() {
        let mut map = DebounceMap::new();
        // The entry stays in the map while the fired timer's work runs; it is
        // cleared only after the work completes.
        let running = map.reschedule(Path::new("/f"));

        let newer = map.reschedule(Path::new("/f"));
        assert!(running.is_cancelled(), "in-flight refresh must be cancelled");
        assert!(
            !map.clear_if_current(Path::new("/f"), &running),
            "superseded run no longer owns the entry"
        );
        assert!(map.clear_if_current(Path::new("/f"), &newer));
    }

    #[test]
    fn cancel_all_fires_every_token() {
        let mut map = DebounceMap::new();
        let a = map.reschedule(Path::new("/a"));
        let b = map.reschedule(Path::new("/b"));
        map.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert_eq!(map.len(), 0);
    }
}
