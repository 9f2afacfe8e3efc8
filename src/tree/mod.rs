//! In-memory mirror of a tracked directory tree.
//!
//! Each `FileNode` mirrors one filesystem entry. The tree is strictly owned
//! top-down (`children` vectors, no shared pointers); node identity across
//! refreshes is carried by a stable `NodeId` so a bound UI can keep
//! selection/expansion state when `reconcile` reuses a node.
//!
//! Children are kept in a deterministic order — folders first, then
//! case-insensitive alphabetical — so reconciliation never visibly reshuffles
//! unaffected siblings.

pub mod reconcile;

pub use reconcile::reconcile;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Stable identity of a node across reconciles.
pub type NodeId = u64;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// One entry of a fresh directory enumeration. Plain data, safe to ship
/// across threads to wherever the tree is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_folder: bool,
}

/// In-memory mirror of one filesystem entry within a tracked tree.
///
/// Invariant: for every child, `child.path == parent.path.join(&child.name)`
/// and no two children of the same parent share a case-insensitive name.
#[derive(Debug)]
pub struct FileNode {
    id: NodeId,
    pub name: String,
    pub path: PathBuf,
    pub is_folder: bool,
    pub children: Vec<FileNode>,
}

impl FileNode {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, is_folder: bool) -> Self {
        Self {
            id: next_node_id(),
            name: name.into(),
            path: path.into(),
            is_folder,
            children: Vec::new(),
        }
    }

    /// Stable identity, assigned once at creation and preserved by reconcile.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Find a direct child by case-insensitive name.
    pub fn child(&self, name: &str) -> Option<&FileNode> {
        self.children
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut FileNode> {
        self.children
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Deterministic sibling ordering: folders first, then case-insensitive
/// alphabetical.
pub(crate) fn entry_order(a_name: &str, a_folder: bool, b_name: &str, b_folder: bool) -> Ordering {
    match (a_folder, b_folder) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a_name.to_lowercase().cmp(&b_name.to_lowercase()),
    }
}

/// Enumerate one directory level, sorted in sibling order.
///
/// This is the only source of truth reconcile ever consumes: listings are
/// taken fresh from disk at fire time because change-notification APIs can
/// drop or reorder events under load — events are wake-up signals only.
pub fn list_directory(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_folder = entry.file_type()?.is_dir();
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push(DirEntry {
            name,
            path,
            is_folder,
        });
    }
    entries.sort_by(|a, b| entry_order(&a.name, a.is_folder, &b.name, b.is_folder));
    Ok(entries)
}

/// Recursively build a full tree for a target root.
///
/// Used only for the initial load of a target — it is not incremental.
/// Incremental updates go through `reconcile`.
pub fn build_tree(root: &Path) -> Result<FileNode> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned());
    let is_folder = root.is_dir();
    let mut node = FileNode::new(name, root, is_folder);
    if is_folder {
        let listing = list_directory(root)
            .with_context(|| format!("enumerating {}", root.display()))?;
        for entry in listing {
            node.children.push(build_tree(&entry.path)?);
        }
    }
    Ok(node)
}

/// Locate the node mirroring `path` by descending from `root`.
///
/// Descent is by path components with case-insensitive name matching, so the
/// cost is O(depth), not O(tree size). Returns `None` when `path` is outside
/// the root or not mirrored.
pub fn node_at<'a>(root: &'a FileNode, path: &Path) -> Option<&'a FileNode> {
    let rel = path.strip_prefix(&root.path).ok()?;
    let mut node = root;
    for component in rel.components() {
        let name = component.as_os_str().to_string_lossy();
        node = node.child(&name)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(root: &'a mut FileNode, path: &Path) -> Option<&'a mut FileNode> {
    let rel = path.strip_prefix(&root.path).ok()?.to_path_buf();
    let mut node = root;
    for component in rel.components() {
        let name = component.as_os_str().to_string_lossy().into_owned();
        node = node.child_mut(&name)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn list_directory_orders_folders_first_then_alpha() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Zeta.lua"), "").unwrap();
        fs::write(dir.path().join("alpha.lua"), "").unwrap();
        fs::create_dir(dir.path().join("media")).unwrap();
        fs::create_dir(dir.path().join("Common")).unwrap();

        let listing = list_directory(dir.path()).unwrap();
        let names: Vec<&str> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Common", "media", "alpha.lua", "Zeta.lua"]);
    }

    #[test]
    fn build_tree_mirrors_nested_layout() {
        let dir = TempDir::new().unwrap();
        let lua = dir.path().join("media").join("lua");
        fs::create_dir_all(&lua).unwrap();
        fs::write(lua.join("client.lua"), "-- client").unwrap();

        let tree = build_tree(dir.path()).unwrap();
        assert!(tree.is_folder);
        let media = tree.child("media").unwrap();
        let lua_node = media.child("lua").unwrap();
        let file = lua_node.child("client.lua").unwrap();
        assert!(!file.is_folder);
        assert_eq!(file.path, lua.join("client.lua"));
    }

    #[test]
    fn node_at_descends_by_components() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("media").join("scripts");
        fs::create_dir_all(&nested).unwrap();

        let tree = build_tree(dir.path()).unwrap();
        let found = node_at(&tree, &nested).unwrap();
        assert_eq!(found.path, nested);
        assert!(node_at(&tree, Path::new("/definitely/elsewhere")).is_none());
    }

    #[test]
    fn child_lookup_is_case_insensitive() {
        let mut node = FileNode::new("root", "/root", true);
        node.children.push(FileNode::new("Media", "/root/Media", true));
        assert!(node.child("media").is_some());
        assert!(node.child("MEDIA").is_some());
        assert!(node.child("script").is_none());
    }
}
