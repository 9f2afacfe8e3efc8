//! Project and build-target model.
//!
//! A project is a mod folder on disk; each build variant it supports is a
//! `Target` rooted either at the project folder itself (the primary target)
//! or at a version-numbered subfolder like `41` or `42.3`. Targets own their
//! in-memory trees; descriptor metadata parsing lives outside this crate.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::tree::{build_tree, FileNode};

/// One build-variant root of a project.
#[derive(Debug)]
pub struct Target {
    pub build: f64,
    pub path: PathBuf,
    pub tree: Option<FileNode>,
}

impl Target {
    pub fn new(build: f64, path: impl Into<PathBuf>) -> Self {
        Self {
            build,
            path: path.into(),
            tree: None,
        }
    }

    /// Rebuild this target's tree from disk. Full, non-incremental.
    pub fn load_tree(&mut self) -> Result<()> {
        if self.path.is_dir() {
            self.tree = Some(build_tree(&self.path)?);
        }
        Ok(())
    }
}

/// A mod project and its ordered list of build targets.
#[derive(Debug)]
pub struct Project {
    pub name: String,
    pub root_path: PathBuf,
    pub targets: Vec<Target>,
}

impl Project {
    /// The primary target is the one rooted at the project folder itself.
    pub fn primary_target(&self) -> Option<&Target> {
        self.targets.iter().find(|t| t.path == self.root_path)
    }

    pub fn target(&self, build: f64) -> Option<&Target> {
        self.targets.iter().find(|t| t.build == build)
    }
}

/// Discover a project's build targets from its folder layout.
///
/// The project root becomes the primary target at `primary_build`; every
/// subfolder whose name parses as a number becomes an additional versioned
/// target.
pub fn discover_targets(
    name: impl Into<String>,
    root: &Path,
    primary_build: f64,
) -> std::io::Result<Project> {
    let mut targets = vec![Target::new(primary_build, root)];

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let folder_name = entry.file_name().to_string_lossy().into_owned();
        if let Ok(build) = folder_name.parse::<f64>() {
            targets.push(Target::new(build, entry.path()));
        }
    }

    Ok(Project {
        name: name.into(),
        root_path: root.to_path_buf(),
        targets,
    })
}

/// Create the standard mod folder skeleton under a target root.
pub fn create_target_skeleton(root: &Path) -> std::io::Result<()> {
    let media = root.join("media");
    let lua = media.join("lua");
    for dir in [
        root.to_path_buf(),
        root.join("common"),
        lua.join("client"),
        lua.join("server"),
        lua.join("shared"),
        media.join("scripts"),
        media.join("ui"),
    ] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_targets_finds_versioned_folders() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("41")).unwrap();
        std::fs::create_dir(dir.path().join("42.3")).unwrap();
        std::fs::create_dir(dir.path().join("media")).unwrap();

        let project = discover_targets("TestMod", dir.path(), 42.0).unwrap();
        assert_eq!(project.targets.len(), 3);
        assert_eq!(project.primary_target().unwrap().build, 42.0);
        assert!(project.target(41.0).is_some());
        assert!(project.target(42.3).is_some());
    }

    #[test]
    fn skeleton_creates_standard_layout() {
        let dir = TempDir::new().unwrap();
        create_target_skeleton(dir.path()).unwrap();
        assert!(dir.path().join("media").join("lua").join("client").is_dir());
        assert!(dir.path().join("media").join("scripts").is_dir());
        assert!(dir.path().join("common").is_dir());
    }
}
