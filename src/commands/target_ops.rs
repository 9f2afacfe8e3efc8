//! Build-target deletion: the backup-before-mutate pattern scoped to an
//! entire build-variant root, plus the in-memory target list bookkeeping.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::config::CoreConfig;
use crate::fsops;
use crate::project::{Project, Target};

use super::file_ops::Backup;
use super::{CommandError, UndoableCommand};

/// Delete a versioned build target: removes the in-memory `Target` entry and
/// its directory on `execute`; `undo` restores the directory byte-for-byte,
/// re-inserts the entry and reloads its tree.
#[derive(Debug)]
pub struct TargetDeleteCommand {
    project: Arc<Mutex<Project>>,
    build: f64,
    target_path: PathBuf,
    backup: Option<Backup>,
    config: CoreConfig,
    description: String,
}

impl TargetDeleteCommand {
    /// Snapshot the target's directory before any mutation.
    ///
    /// Structural conflicts — unknown build, or the primary (project-root)
    /// target — are rejected here with zero filesystem side effects.
    pub fn new(
        project: Arc<Mutex<Project>>,
        build: f64,
        config: CoreConfig,
    ) -> Result<Self, CommandError> {
        let target_path = {
            let project = project.lock().unwrap_or_else(|p| p.into_inner());
            let target = project
                .targets
                .iter()
                .find(|t| t.build == build)
                .ok_or(CommandError::UnknownTarget(build))?;
            if target.path == project.root_path {
                return Err(CommandError::PrimaryTarget);
            }
            target.path.clone()
        };

        let backup = Backup::capture(&target_path)?;
        let description = format!("Delete build target: {build}");
        Ok(Self {
            project,
            build,
            target_path,
            backup: Some(backup),
            config,
            description,
        })
    }
}

impl UndoableCommand for TargetDeleteCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn affected_paths(&self) -> Vec<PathBuf> {
        vec![self.target_path.clone()]
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        if self.backup.is_none() && self.target_path.exists() {
            self.backup = Some(Backup::capture(&self.target_path)?);
        }

        {
            let mut project = self.project.lock().unwrap_or_else(|p| p.into_inner());
            project.targets.retain(|t| t.build != self.build);
        }

        fsops::remove_path_robust(
            &self.target_path,
            self.config.remove_retries,
            self.config.remove_backoff,
            None,
        )?;
        Ok(())
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        let Some(backup) = self.backup.as_ref() else {
            return Err(CommandError::NotFound(self.target_path.clone()));
        };
        backup.restore_to(&self.target_path)?;
        self.backup = None;

        let mut target = Target::new(self.build, self.target_path.clone());
        if let Err(err) = target.load_tree() {
            warn!(path = %self.target_path.display(), %err, "restored target tree not loaded");
        }

        let mut project = self.project.lock().unwrap_or_else(|p| p.into_inner());
        project.targets.push(target);
        Ok(())
    }
}
