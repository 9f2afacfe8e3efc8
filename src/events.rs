//! Typed event channel between the background pipeline and the tree owner.
//!
//! Watch callbacks and debounce timers never mutate the tree directly; they
//! publish `CoreEvent`s on an unbounded channel and one dispatcher loop (the
//! UI thread in a desktop shell, the test body in tests) consumes them and
//! applies the mutations. This replaces callback-style event wiring with a
//! single consumer whose lifetime is explicit.

use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::tree::DirEntry;
use crate::watch::opened_file::FileKind;

/// What the command stack just did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandAction {
    Executed,
    Undone,
    Redone,
}

/// Events published by the core pipeline.
#[derive(Debug, Clone, Serialize)]
pub enum CoreEvent {
    /// A watched folder changed on disk. Carries a fresh enumeration taken at
    /// debounce-fire time (never reconstructed from raw watch events, which
    /// can be dropped or reordered under load).
    FolderChanged {
        folder: PathBuf,
        listing: Vec<DirEntry>,
    },
    /// The opened file disappeared from disk.
    FileGone { path: PathBuf },
    /// The opened file changed and was re-read successfully.
    FileReloaded {
        path: PathBuf,
        content: String,
        kind: FileKind,
    },
    /// A command was executed, undone or redone. `paths` identifies the
    /// affected filesystem locations so a listener can request a scoped
    /// refresh of just those folders instead of a full rebuild.
    Command {
        action: CommandAction,
        description: String,
        paths: Vec<PathBuf>,
    },
}

pub type EventSender = mpsc::UnboundedSender<CoreEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<CoreEvent>;

/// Create the event channel consumed by the dispatcher loop.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_for_diagnostics() {
        let event = CoreEvent::FolderChanged {
            folder: PathBuf::from("/mods/a/media"),
            listing: vec![DirEntry {
                name: "lua".into(),
                path: PathBuf::from("/mods/a/media/lua"),
                is_folder: true,
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("FolderChanged"));
        assert!(json.contains("lua"));
    }
}
