//! modtree: filesystem mirror and undo core for a mod project editor.
//!
//! Maintains an in-memory mirror of a mod project's directory tree, keeps it
//! consistent with the real filesystem as external processes and the user
//! change files, and provides reversible (undoable) file operations.
//!
//! # Architecture
//!
//! - [`tree`] — the node model, initial full-directory build, and the
//!   identity-preserving reconcile diff.
//! - [`watch`] — one non-recursive native watch per expanded folder, per-path
//!   debounce, and the single-opened-file monitor.
//! - [`commands`] — the undo/redo stack and backup-and-restore file commands.
//! - [`session`] — the service object wiring it all together per project.
//!
//! # Control flow
//!
//! User expansion mounts a watch; raw watch events are debounced per path;
//! an uncancelled timer takes a fresh disk enumeration and publishes a
//! [`events::CoreEvent::FolderChanged`]; the session's dispatcher applies the
//! reconcile on the tree-owning context. User edits go through the command
//! stack, whose disk mutations re-enter the same watch pipeline — one code
//! path for "disk changed", whether the change came from inside or outside.

pub mod cancel;
pub mod commands;
pub mod config;
pub mod events;
pub mod fsops;
pub mod project;
pub mod session;
pub mod tree;
pub mod watch;

pub use cancel::CancelToken;
pub use commands::{
    CommandError, CommandStack, CreateCommand, DeleteCommand, MoveCommand, TargetDeleteCommand,
    UndoableCommand,
};
pub use config::CoreConfig;
pub use events::{CommandAction, CoreEvent, EventReceiver, EventSender};
pub use project::{create_target_skeleton, discover_targets, Project, Target};
pub use session::ProjectSession;
pub use tree::{
    build_tree, list_directory, node_at, node_at_mut, reconcile, DirEntry, FileNode, NodeId,
};
pub use watch::{detect_file_kind, FileKind, OpenedFileMonitor, WatchRegistry};
