//! Session object tying the tree model, watch pipeline, opened-file monitor
//! and command stack together.
//!
//! Everything here is an explicitly constructed service owned by the session
//! — no process-wide singletons — so tests and multiple concurrent projects
//! get isolated instances.
//!
//! The session's owner drives the dispatcher loop: it drains the
//! `EventReceiver` and calls `apply_event` for each event. That loop is the
//! single writer of tree state ("tree-owning thread"); watch callbacks and
//! debounce timers only publish onto the channel.

use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::commands::CommandStack;
use crate::config::CoreConfig;
use crate::events::{self, CoreEvent, EventReceiver};
use crate::project::Project;
use crate::tree::{self, DirEntry};
use crate::watch::{OpenedFileMonitor, WatchRegistry};

pub struct ProjectSession {
    project: Arc<Mutex<Project>>,
    registry: Arc<WatchRegistry>,
    monitor: Arc<OpenedFileMonitor>,
    commands: CommandStack,
    config: CoreConfig,
}

impl ProjectSession {
    /// Build a session for `project`. The returned receiver is the event
    /// stream the owner must drain and feed back through `apply_event`.
    pub fn new(
        project: Project,
        config: CoreConfig,
        runtime: Handle,
    ) -> (Self, EventReceiver) {
        let (tx, rx) = events::channel();
        let monitor = OpenedFileMonitor::new(config.clone(), tx.clone(), runtime.clone());
        let registry = WatchRegistry::new(config.clone(), tx.clone(), monitor.clone(), runtime);
        let commands = CommandStack::new(tx);
        let session = Self {
            project: Arc::new(Mutex::new(project)),
            registry,
            monitor,
            commands,
            config,
        };
        (session, rx)
    }

    /// Shared handle to the project; needed by `TargetDeleteCommand`.
    pub fn project(&self) -> Arc<Mutex<Project>> {
        self.project.clone()
    }

    pub fn commands(&self) -> &CommandStack {
        &self.commands
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Build the full tree of every target. Initial load only; afterwards
    /// the watch pipeline keeps expanded folders current.
    pub fn load_trees(&self) -> Result<()> {
        let mut project = self.lock_project();
        for target in &mut project.targets {
            target.load_tree()?;
        }
        Ok(())
    }

    /// The user expanded a folder: mount its watch.
    pub fn folder_expanded(&self, path: &Path) -> Result<()> {
        self.registry.ensure_watch(path)
    }

    /// The user collapsed a folder: cancel pending work, drop its watch.
    pub fn folder_collapsed(&self, path: &Path) {
        self.registry.stop_watch(path);
    }

    /// The user loaded a file into the editor.
    pub fn file_opened(&self, path: &Path) -> Result<()> {
        self.monitor.open(path)
    }

    /// The user closed the editor tab.
    pub fn file_closed(&self) {
        self.monitor.close();
    }

    /// Apply one event from the session's channel. Must be called from the
    /// context that owns the trees — this is where child lists are swapped.
    pub fn apply_event(&self, event: &CoreEvent) {
        match event {
            CoreEvent::FolderChanged { folder, listing } => {
                self.apply_listing(folder, listing);
            }
            CoreEvent::Command { paths, .. } => {
                // Scoped refresh of just the affected folders; the watch
                // pipeline also catches these changes for expanded folders,
                // but collapsed ancestors carry no watch.
                for path in paths {
                    if let Some(parent) = path.parent() {
                        if let Err(err) = self.refresh_folder(parent) {
                            warn!(folder = %parent.display(), %err, "scoped refresh failed");
                        }
                    }
                }
            }
            CoreEvent::FileGone { .. } | CoreEvent::FileReloaded { .. } => {
                // Editor content state; consumed by the shell and the
                // content validator, not by the tree.
            }
        }
    }

    /// Re-enumerate one folder right now and reconcile every tree that
    /// mirrors it. The scoped alternative to a full rebuild.
    pub fn refresh_folder(&self, folder: &Path) -> Result<()> {
        if !folder.is_dir() {
            return Ok(());
        }
        let listing = tree::list_directory(folder)?;
        self.apply_listing(folder, &listing);
        Ok(())
    }

    fn apply_listing(&self, folder: &Path, listing: &[DirEntry]) {
        let mut project = self.lock_project();
        for target in &mut project.targets {
            let Some(root) = target.tree.as_mut() else {
                continue;
            };
            if let Some(node) = tree::node_at_mut(root, folder) {
                if node.is_folder && tree::reconcile(node, listing) {
                    debug!(folder = %folder.display(), build = target.build, "reconciled");
                }
            }
        }
    }

    /// Tear the whole pipeline down: close the opened file, cancel all
    /// in-flight debounced work, drop every watch.
    pub fn shutdown(&self) {
        self.monitor.close();
        self.registry.shutdown();
    }

    fn lock_project(&self) -> MutexGuard<'_, Project> {
        self.project.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ProjectSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
