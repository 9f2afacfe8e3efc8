//! Watch-and-reload pipeline for the single file loaded in the editor.
//!
//! Exactly one file is monitored at a time. Switching files tears the
//! previous watch down completely before the new one is mounted; a debounced
//! fire re-reads the whole file from disk (with a bounded retry loop, since
//! the writing process may still hold it) and publishes the new content plus
//! its detected kind so the downstream validator can re-run.

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::CoreConfig;
use crate::events::{CoreEvent, EventSender};

/// File kinds the editor recognizes, detected from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Lua script — triggers re-validation on reload.
    Lua,
    /// Plain-text formats shown in the editor (.txt, .cfg, .ini, .md, .xml, .json).
    Script,
    /// Mod descriptor (.info).
    Descriptor,
    /// Anything else; shown as-is, never validated.
    Other,
}

/// Detect the file kind from a path's extension.
pub fn detect_file_kind(path: &Path) -> FileKind {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FileKind::Other;
    };
    match ext.to_ascii_lowercase().as_str() {
        "lua" => FileKind::Lua,
        "txt" | "cfg" | "ini" | "md" | "xml" | "json" => FileKind::Script,
        "info" => FileKind::Descriptor,
        _ => FileKind::Other,
    }
}

#[derive(Default)]
struct MonitorState {
    watcher: Option<RecommendedWatcher>,
    path: Option<PathBuf>,
    pending: Option<CancelToken>,
}

/// Watches exactly one file — the one currently loaded for editing.
///
/// One mutex guards the watch handle, the open path and the pending debounce
/// token together, so cancel-and-reschedule is atomic against concurrent
/// events for the same file.
pub struct OpenedFileMonitor {
    state: Mutex<MonitorState>,
    events: EventSender,
    config: CoreConfig,
    runtime: Handle,
    // Needed so watch callbacks and spawned timers can reach back into the
    // monitor without keeping it alive.
    weak_self: Weak<OpenedFileMonitor>,
}

impl OpenedFileMonitor {
    pub fn new(config: CoreConfig, events: EventSender, runtime: Handle) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(MonitorState::default()),
            events,
            config,
            runtime,
            weak_self: weak.clone(),
        })
    }

    /// Start monitoring `path`, tearing down any previous watch first.
    /// Never two simultaneous single-file watches.
    pub fn open(&self, path: &Path) -> Result<()> {
        self.close();

        let weak = self.weak_self.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let Some(monitor) = weak.upgrade() else {
                    return;
                };
                match result {
                    Ok(event) => {
                        if !matches!(event.kind, notify::EventKind::Access(_)) {
                            monitor.schedule_reload();
                        }
                    }
                    Err(err) => warn!(%err, "opened-file watch error"),
                }
            })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let mut state = self.lock_state();
        state.watcher = Some(watcher);
        state.path = Some(path.to_path_buf());
        debug!(path = %path.display(), "opened-file watch mounted");
        Ok(())
    }

    /// Stop monitoring: cancel any pending reload, release the watch.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if let Some(token) = state.pending.take() {
            token.cancel();
        }
        state.watcher = None;
        state.path = None;
    }

    /// Path currently being monitored, if any.
    pub fn open_path(&self) -> Option<PathBuf> {
        self.lock_state().path.clone()
    }

    /// Whether `path` is the currently open file (case-insensitive, since the
    /// watch pipeline may report either spelling).
    pub fn is_open(&self, path: &Path) -> bool {
        self.lock_state()
            .path
            .as_deref()
            .is_some_and(|open| paths_match(open, path))
    }

    /// Called by the watch registry when a folder event touches the open
    /// file's path (either name of a rename counts).
    pub fn poke(&self, path: &Path) {
        if self.is_open(path) {
            self.schedule_reload();
        }
    }

    /// Debounce a reload: cancel the pending timer, arm a new one.
    fn schedule_reload(&self) {
        let (path, token) = {
            let mut state = self.lock_state();
            let Some(path) = state.path.clone() else {
                return;
            };
            if let Some(previous) = state.pending.take() {
                previous.cancel();
            }
            let token = CancelToken::new();
            state.pending = Some(token.clone());
            (path, token)
        };

        let monitor = self.weak_self.clone();
        let events = self.events.clone();
        let config = self.config.clone();
        self.runtime.spawn(async move {
            reload_after_quiet_window(monitor, events, config, path, token).await;
        });
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Release the pending slot if it still belongs to `token`, returning
    /// whether it did. A superseded run must not publish.
    fn finish_pending(&self, token: &CancelToken) -> bool {
        let mut state = self.lock_state();
        if state.pending.as_ref().is_some_and(|t| t.same(token)) {
            state.pending = None;
            true
        } else {
            false
        }
    }
}

/// The debounced reload body: wait out the quiet window, then re-read the
/// file from disk and publish the outcome. A cancelled timer does nothing.
///
/// The pending slot stays held for the whole run, so a new change to the
/// file supersedes (cancels) an in-flight reload via `schedule_reload`; only
/// the run that still owns the slot afterwards may publish.
async fn reload_after_quiet_window(
    monitor: Weak<OpenedFileMonitor>,
    events: EventSender,
    config: CoreConfig,
    path: PathBuf,
    token: CancelToken,
) {
    tokio::time::sleep(config.reload_debounce).await;
    if token.is_cancelled() {
        return;
    }

    let outcome = if path.exists() {
        Some(read_with_retry(&path, config.read_retries, config.read_backoff, &token).await)
    } else {
        None
    };

    let Some(monitor) = monitor.upgrade() else {
        return;
    };
    let owns_slot = monitor.finish_pending(&token);
    drop(monitor);
    if !owns_slot || token.is_cancelled() {
        return;
    }

    match outcome {
        None => {
            // File deleted out from under the editor: publish a placeholder
            // state without touching disk.
            let _ = events.send(CoreEvent::FileGone { path });
        }
        Some(Ok(Some(bytes))) => {
            let content = String::from_utf8_lossy(&bytes).into_owned();
            let kind = detect_file_kind(&path);
            let _ = events.send(CoreEvent::FileReloaded {
                path,
                content,
                kind,
            });
        }
        Some(Ok(None)) => {} // cancelled mid-retry
        Some(Err(err)) => {
            warn!(path = %path.display(), %err, "giving up reloading opened file");
        }
    }
}

/// Read the file's full content, retrying transient failures with linear
/// backoff. Returns `Ok(None)` when the token fires mid-retry.
async fn read_with_retry(
    path: &Path,
    retries: u32,
    backoff: std::time::Duration,
    token: &CancelToken,
) -> std::io::Result<Option<Vec<u8>>> {
    let attempts = retries.max(1);
    for attempt in 1..=attempts {
        match tokio::fs::read(path).await {
            Ok(bytes) => return Ok(Some(bytes)),
            Err(err) if attempt == attempts => return Err(err),
            Err(_) => {
                tokio::time::sleep(backoff * attempt).await;
                if token.is_cancelled() {
                    return Ok(None);
                }
            }
        }
    }
    unreachable!("retry loop always returns")
}

/// Case-insensitive path comparison; the original tool targets a filesystem
/// where `Media` and `media` are the same entry.
pub(crate) fn paths_match(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    a.to_string_lossy()
        .eq_ignore_ascii_case(&b.to_string_lossy())
}
