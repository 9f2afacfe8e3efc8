//! Create, delete and move commands over project files.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::config::CoreConfig;
use crate::fsops;

use super::{CommandError, UndoableCommand};

/// Private backup snapshot held by a destructive command.
///
/// Captured before the first mutation; restoring copies the bytes back to
/// the original location. The snapshot lives in its own temp directory and
/// is released when the `Backup` is dropped (after a successful undo, or
/// when the owning command is evicted from the stack).
#[derive(Debug)]
pub(crate) struct Backup {
    _dir: TempDir,
    snapshot: PathBuf,
    is_folder: bool,
}

impl Backup {
    /// Snapshot the full byte content of a file or the entire subtree of a
    /// directory into a private temporary location.
    pub(crate) fn capture(path: &Path) -> Result<Self, CommandError> {
        if !path.exists() {
            return Err(CommandError::NotFound(path.to_path_buf()));
        }
        let dir = TempDir::with_prefix("modtree-backup-")?;
        let name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        let snapshot = dir.path().join(name);
        let is_folder = path.is_dir();
        if is_folder {
            fsops::copy_dir_recursive(path, &snapshot)?;
        } else {
            std::fs::copy(path, &snapshot)?;
        }
        Ok(Self {
            _dir: dir,
            snapshot,
            is_folder,
        })
    }

    /// Restore the snapshot byte-for-byte to `dest`.
    pub(crate) fn restore_to(&self, dest: &Path) -> Result<(), CommandError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if self.is_folder {
            fsops::copy_dir_recursive(&self.snapshot, dest)?;
        } else {
            std::fs::copy(&self.snapshot, dest)?;
        }
        Ok(())
    }
}

/// What a create command puts on disk.
#[derive(Debug)]
enum CreateKind {
    File { content: String },
    Folder,
}

/// Create a file with initial content, or an empty folder.
/// Undo deletes exactly that path — creation needs no backup. A created
/// folder is only removed while still empty.
pub struct CreateCommand {
    path: PathBuf,
    kind: CreateKind,
    description: String,
}

impl CreateCommand {
    pub fn file(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let description = format!("Create file {}", display_name(&path));
        Self {
            path,
            kind: CreateKind::File {
                content: content.into(),
            },
            description,
        }
    }

    pub fn folder(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let description = format!("Create folder {}", display_name(&path));
        Self {
            path,
            kind: CreateKind::Folder,
            description,
        }
    }
}

impl UndoableCommand for CreateCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn affected_paths(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        // A pre-existing path is a caller error, rejected with zero side
        // effects (and never retried).
        if self.path.exists() {
            return Err(CommandError::AlreadyExists(self.path.clone()));
        }
        match &self.kind {
            CreateKind::File { content } => {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&self.path, content)?;
            }
            CreateKind::Folder => {
                std::fs::create_dir_all(&self.path)?;
            }
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        match self.kind {
            CreateKind::File { .. } => {
                if self.path.exists() {
                    std::fs::remove_file(&self.path)?;
                }
            }
            CreateKind::Folder => {
                if self.path.exists() {
                    // Only the empty folder this command created is removed;
                    // content added since then makes the undo fail and the
                    // command stays on the stack.
                    std::fs::remove_dir(&self.path)?;
                }
            }
        }
        Ok(())
    }
}

/// Delete a file or a whole directory.
///
/// The backup snapshot is taken in the constructor, before any mutation, so
/// undo can restore the exact prior bytes even after the removal retried its
/// way through transient locks.
pub struct DeleteCommand {
    path: PathBuf,
    backup: Option<Backup>,
    config: CoreConfig,
    description: String,
}

impl DeleteCommand {
    pub fn new(path: impl Into<PathBuf>, config: CoreConfig) -> Result<Self, CommandError> {
        let path = path.into();
        let backup = Backup::capture(&path)?;
        let description = format!("Delete {}", display_name(&path));
        Ok(Self {
            path,
            backup: Some(backup),
            config,
            description,
        })
    }
}

impl UndoableCommand for DeleteCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn affected_paths(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        // Redo after an undo released the snapshot: re-capture before
        // destroying the restored bytes again.
        if self.backup.is_none() && self.path.exists() {
            self.backup = Some(Backup::capture(&self.path)?);
        }
        fsops::remove_path_robust(
            &self.path,
            self.config.remove_retries,
            self.config.remove_backoff,
            None,
        )?;
        Ok(())
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        let Some(backup) = self.backup.as_ref() else {
            return Err(CommandError::NotFound(self.path.clone()));
        };
        backup.restore_to(&self.path)?;
        // Best-effort release of the snapshot once restored.
        self.backup = None;
        debug!(path = %self.path.display(), "restored from backup");
        Ok(())
    }
}

/// Same-volume rename. `execute` and `undo` are mutual inverses, so no
/// backup store is needed.
pub struct MoveCommand {
    source: PathBuf,
    destination: PathBuf,
    description: String,
}

impl MoveCommand {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let destination = destination.into();
        let description = format!(
            "Move {} -> {}",
            display_name(&source),
            destination.display()
        );
        Self {
            source,
            destination,
            description,
        }
    }
}

impl UndoableCommand for MoveCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn affected_paths(&self) -> Vec<PathBuf> {
        vec![self.source.clone(), self.destination.clone()]
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        // All structural conflicts are rejected before any mutation.
        if !self.source.exists() {
            return Err(CommandError::NotFound(self.source.clone()));
        }
        if self.destination.exists() {
            return Err(CommandError::AlreadyExists(self.destination.clone()));
        }
        if self.destination.starts_with(&self.source) {
            return Err(CommandError::DestinationInsideSource(
                self.destination.clone(),
            ));
        }
        if let Some(parent) = self.destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&self.source, &self.destination)?;
        Ok(())
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        if let Some(parent) = self.source.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&self.destination, &self.source)?;
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
