//! Per-folder filesystem watches with debounced reconciliation.
//!
//! One non-recursive native watch per expanded folder. Non-recursive is
//! deliberate: each expanded subfolder gets its own independent watch, which
//! avoids duplicate event delivery for deeply nested expansions and handle
//! exhaustion on large trees. Collapsed subtrees stay in memory but carry no
//! watch and receive no updates until expanded again.
//!
//! Watch callbacks fire on the notify backend's threads and only ever lock,
//! reschedule and spawn — the tree itself is mutated by whoever drains the
//! event channel (see `events`).

pub mod debounce;
pub mod opened_file;

pub use opened_file::{detect_file_kind, FileKind, OpenedFileMonitor};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::CoreConfig;
use crate::events::{CoreEvent, EventSender};
use crate::tree::list_directory;
use debounce::DebounceMap;

/// Both maps live under the one mutex: cancelling the previous debounce and
/// rescheduling must be atomic with respect to concurrent events on the same
/// path, and watch teardown must cancel the path's pending work in the same
/// critical section.
#[derive(Default)]
struct RegistryState {
    watches: HashMap<PathBuf, RecommendedWatcher>,
    pending: DebounceMap,
}

/// Owns one native change-watch per expanded folder and the per-path
/// debounce state that coalesces event bursts into single refreshes.
pub struct WatchRegistry {
    state: Mutex<RegistryState>,
    events: EventSender,
    config: CoreConfig,
    runtime: Handle,
    /// Forwarding seam: events touching the opened file's path also debounce
    /// a reload there.
    monitor: Arc<OpenedFileMonitor>,
    weak_self: Weak<WatchRegistry>,
}

impl WatchRegistry {
    pub fn new(
        config: CoreConfig,
        events: EventSender,
        monitor: Arc<OpenedFileMonitor>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(RegistryState::default()),
            events,
            config,
            runtime,
            monitor,
            weak_self: weak.clone(),
        })
    }

    /// Mount a non-recursive watch on `path` if one is not already mounted.
    ///
    /// Idempotent; a no-op for paths that are not directories. Called when
    /// the user expands a folder in the tree.
    pub fn ensure_watch(&self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Ok(());
        }
        let mut state = self.lock_state();
        if state.watches.contains_key(path) {
            return Ok(());
        }

        let folder = path.to_path_buf();
        let weak = self.weak_self.clone();
        let callback_folder = folder.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let Some(registry) = weak.upgrade() else {
                    return;
                };
                match result {
                    Ok(event) => registry.handle_raw_event(&callback_folder, &event),
                    Err(err) => {
                        // Typically the watched directory itself went away.
                        // The watch just stops; the parent's next reconcile
                        // prunes the node.
                        debug!(folder = %callback_folder.display(), %err, "watch stopped");
                    }
                }
            })
            .context("creating folder watch")?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {}", path.display()))?;

        state.watches.insert(folder.clone(), watcher);
        debug!(folder = %folder.display(), "watch mounted");
        Ok(())
    }

    /// Cancel any pending debounce for `path` and release its watch handle.
    /// Called on folder-collapse and on teardown.
    pub fn stop_watch(&self, path: &Path) {
        let mut state = self.lock_state();
        state.pending.cancel(path);
        if state.watches.remove(path).is_some() {
            debug!(folder = %path.display(), "watch unmounted");
        }
    }

    /// Whether `path` currently carries a watch.
    pub fn is_watched(&self, path: &Path) -> bool {
        self.lock_state().watches.contains_key(path)
    }

    /// Tear everything down: cancel all in-flight debounced work and drop
    /// every watch handle.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        state.pending.cancel_all();
        state.watches.clear();
    }

    /// Raw watch callback: route rename/create/delete/modify events into the
    /// debounce pipeline. Never mutates tree state.
    fn handle_raw_event(&self, folder: &Path, event: &notify::Event) {
        if matches!(event.kind, notify::EventKind::Access(_)) {
            return;
        }
        // Either name of a rename may be the opened file.
        for path in &event.paths {
            self.monitor.poke(path);
        }
        self.schedule_refresh(folder);
    }

    /// Debounce a refresh of `folder`: cancel the pending timer and arm a
    /// fresh one. When the timer fires uncancelled it enumerates the folder
    /// from disk and publishes a `FolderChanged` event.
    fn schedule_refresh(&self, folder: &Path) {
        let token = {
            let mut state = self.lock_state();
            // A folder whose watch was already torn down gets no refresh.
            if !state.watches.contains_key(folder) {
                return;
            }
            state.pending.reschedule(folder)
        };

        let weak = self.weak_self.clone();
        let events = self.events.clone();
        let window = self.config.folder_debounce;
        let folder = folder.to_path_buf();
        self.runtime.spawn(async move {
            refresh_after_quiet_window(weak, events, window, folder, token).await;
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Debounced refresh body: wait out the quiet window, then take a fresh
/// enumeration and publish it. A cancelled timer performs no work at all.
///
/// The pending entry stays registered for the whole run, so at most one
/// refresh is in flight per path: a new event arriving while the enumeration
/// runs cancels this token via `reschedule`, and only the run that still owns
/// its entry afterwards may publish. A superseded run's stale listing is
/// never sent.
async fn refresh_after_quiet_window(
    registry: Weak<WatchRegistry>,
    events: EventSender,
    window: std::time::Duration,
    folder: PathBuf,
    token: CancelToken,
) {
    tokio::time::sleep(window).await;
    if token.is_cancelled() {
        return;
    }

    // The listing is always a fresh disk enumeration taken now; the raw
    // events that woke us are only wake-up signals and may have been dropped
    // or reordered.
    let outcome = list_directory(&folder);

    let Some(registry) = registry.upgrade() else {
        return;
    };
    let owns_entry = registry
        .lock_state()
        .pending
        .clear_if_current(&folder, &token);
    if !owns_entry || token.is_cancelled() {
        return;
    }

    match outcome {
        Ok(listing) => {
            let _ = events.send(CoreEvent::FolderChanged { folder, listing });
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            // Folder vanished between the event and the fire; the parent's
            // next reconcile observes the disappearance.
            debug!(folder = %folder.display(), "watched folder no longer exists");
        }
        Err(err) => {
            warn!(folder = %folder.display(), %err, "could not enumerate watched folder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(rt: &tokio::runtime::Runtime) -> Arc<WatchRegistry> {
        let (tx, _rx) = crate::events::channel();
        let monitor =
            OpenedFileMonitor::new(CoreConfig::default(), tx.clone(), rt.handle().clone());
        WatchRegistry::new(CoreConfig::default(), tx, monitor, rt.handle().clone())
    }

    #[test]
    fn watch_mounts_idempotently_and_unmounts_on_stop() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let registry = registry(&rt);
        let dir = TempDir::new().unwrap();

        registry.ensure_watch(dir.path()).unwrap();
        registry.ensure_watch(dir.path()).unwrap();
        assert!(registry.is_watched(dir.path()));

        registry.stop_watch(dir.path());
        assert!(!registry.is_watched(dir.path()));
    }

    #[test]
    fn non_directories_never_get_a_watch() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let registry = registry(&rt);
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.lua");
        std::fs::write(&file, "").unwrap();

        registry.ensure_watch(&file).unwrap();
        assert!(!registry.is_watched(&file));
    }
}
