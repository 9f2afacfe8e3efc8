//! Undo/redo stacks.
//!
//! Invariants: a successful `execute` clears the redo stack; `undo` moves
//! exactly one command undo→redo after running its `undo`; `redo` moves
//! exactly one back after re-running its `execute`. Every transition emits a
//! notification carrying the command's description and affected paths.
//!
//! Unlike the original tool, which relied on the UI disabling buttons, the
//! stack serializes `execute`/`undo`/`redo` internally behind one mutex, and
//! caps undo depth so backup snapshots cannot accumulate without bound.

use std::sync::{Mutex, MutexGuard};

use crate::events::{CommandAction, CoreEvent, EventSender};

use super::{CommandError, UndoableCommand};

/// Default maximum undo depth; the oldest command (and its backup snapshot)
/// is evicted past this.
pub const DEFAULT_UNDO_LIMIT: usize = 64;

#[derive(Default)]
struct Stacks {
    undo: Vec<Box<dyn UndoableCommand>>,
    redo: Vec<Box<dyn UndoableCommand>>,
}

/// Undo/redo stack driving reversible file operations.
pub struct CommandStack {
    stacks: Mutex<Stacks>,
    events: EventSender,
    limit: usize,
}

impl CommandStack {
    pub fn new(events: EventSender) -> Self {
        Self::with_limit(events, DEFAULT_UNDO_LIMIT)
    }

    pub fn with_limit(events: EventSender, limit: usize) -> Self {
        Self {
            stacks: Mutex::new(Stacks::default()),
            events,
            limit: limit.max(1),
        }
    }

    /// Run a command. On success it lands on the undo stack and the redo
    /// stack is cleared; on failure nothing is pushed and the error is
    /// returned to the caller.
    pub fn execute(&self, mut cmd: Box<dyn UndoableCommand>) -> Result<(), CommandError> {
        let mut stacks = self.lock();
        cmd.execute()?;
        self.notify(CommandAction::Executed, cmd.as_ref());
        stacks.redo.clear();
        stacks.undo.push(cmd);
        if stacks.undo.len() > self.limit {
            // Evicting releases the command's backup snapshot with it.
            stacks.undo.remove(0);
        }
        Ok(())
    }

    /// Undo the most recent command. Returns `Ok(false)` when there is
    /// nothing to undo.
    pub fn undo(&self) -> Result<bool, CommandError> {
        let mut stacks = self.lock();
        let Some(mut cmd) = stacks.undo.pop() else {
            return Ok(false);
        };
        match cmd.undo() {
            Ok(()) => {
                self.notify(CommandAction::Undone, cmd.as_ref());
                stacks.redo.push(cmd);
                Ok(true)
            }
            Err(err) => {
                // Leave the command where it was so the stacks stay
                // consistent with disk as far as we know it.
                stacks.undo.push(cmd);
                Err(err)
            }
        }
    }

    /// Re-run the most recently undone command. Returns `Ok(false)` when
    /// there is nothing to redo.
    pub fn redo(&self) -> Result<bool, CommandError> {
        let mut stacks = self.lock();
        let Some(mut cmd) = stacks.redo.pop() else {
            return Ok(false);
        };
        match cmd.execute() {
            Ok(()) => {
                self.notify(CommandAction::Redone, cmd.as_ref());
                stacks.undo.push(cmd);
                Ok(true)
            }
            Err(err) => {
                stacks.redo.push(cmd);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.lock().redo.is_empty()
    }

    /// Descriptions of the undo stack, oldest first. For menus and tests.
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.lock()
            .undo
            .iter()
            .map(|c| c.description().to_string())
            .collect()
    }

    pub fn redo_descriptions(&self) -> Vec<String> {
        self.lock()
            .redo
            .iter()
            .map(|c| c.description().to_string())
            .collect()
    }

    /// Drop both stacks (and every backup snapshot they hold).
    pub fn clear(&self) {
        let mut stacks = self.lock();
        stacks.undo.clear();
        stacks.redo.clear();
    }

    fn notify(&self, action: CommandAction, cmd: &dyn UndoableCommand) {
        let _ = self.events.send(CoreEvent::Command {
            action,
            description: cmd.description().to_string(),
            paths: cmd.affected_paths(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Stacks> {
        self.stacks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
