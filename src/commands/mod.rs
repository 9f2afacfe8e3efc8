//! Reversible file operations and the undo/redo stack driving them.

pub mod file_ops;
pub mod stack;
pub mod target_ops;

pub use file_ops::{CreateCommand, DeleteCommand, MoveCommand};
pub use stack::CommandStack;
pub use target_ops::TargetDeleteCommand;

use std::path::PathBuf;

/// Errors produced by commands.
///
/// Structural conflicts are rejected before any filesystem mutation; I/O
/// errors may follow a bounded retry loop.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Target path of a create, or destination of a move, already exists.
    #[error("path already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Source of a delete or move does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// Moving a folder into its own subtree would create a cycle.
    #[error("destination is inside the source: {0}")]
    DestinationInsideSource(PathBuf),

    /// No target with that build number in the project.
    #[error("no such build target: {0}")]
    UnknownTarget(f64),

    /// The primary (project-root) target cannot be deleted.
    #[error("cannot delete the primary build target")]
    PrimaryTarget,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A reversible operation: `execute` mutates disk (and possibly project
/// state), `undo` restores the exact prior state.
///
/// Commands that destroy data capture a private backup snapshot at
/// construction time, before `execute` ever runs.
pub trait UndoableCommand: Send {
    /// Human-readable description, e.g. `"Create file sandbox.lua"`.
    fn description(&self) -> &str;

    /// Filesystem paths this command touches, so a listener can refresh just
    /// the affected folders.
    fn affected_paths(&self) -> Vec<PathBuf>;

    fn execute(&mut self) -> Result<(), CommandError>;

    fn undo(&mut self) -> Result<(), CommandError>;
}
