//! Identity-preserving diff between a node's children and a fresh listing.

use std::collections::HashMap;

use super::{DirEntry, FileNode};

/// Update `node.children` to match `fresh`, reusing existing nodes.
///
/// - an existing child whose name matches an entry (case-insensitive) is
///   reused: its `NodeId` and entire descendant subtree are kept, while
///   name/path/is_folder are refreshed from the entry;
/// - entries with no matching child become brand-new nodes;
/// - children with no matching entry are dropped.
///
/// The listing must come from a fresh disk enumeration at the moment this
/// runs (`tree::list_directory`), never from the watch events that triggered
/// it. Idempotent: a second call with the same listing performs no churn —
/// every child keeps its id and subtree.
///
/// Computing a listing may happen on any thread; calling this function is the
/// tree mutation itself and belongs to the tree-owning context.
///
/// Returns `true` when the children actually changed.
pub fn reconcile(node: &mut FileNode, fresh: &[DirEntry]) -> bool {
    let old = std::mem::take(&mut node.children);
    let old_ids: Vec<(u64, String)> = old
        .iter()
        .map(|c| (c.id(), c.name.to_lowercase()))
        .collect();

    let mut by_name: HashMap<String, FileNode> = old
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c))
        .collect();

    let mut changed = false;
    let mut next = Vec::with_capacity(fresh.len());
    for entry in fresh {
        match by_name.remove(&entry.name.to_lowercase()) {
            Some(mut existing) => {
                if existing.name != entry.name
                    || existing.path != entry.path
                    || existing.is_folder != entry.is_folder
                {
                    changed = true;
                }
                existing.name = entry.name.clone();
                existing.path = entry.path.clone();
                if existing.is_folder != entry.is_folder {
                    // An entry replaced by one of the other kind under the
                    // same name: the old subtree no longer exists on disk.
                    existing.is_folder = entry.is_folder;
                    existing.children.clear();
                }
                next.push(existing);
            }
            None => {
                next.push(FileNode::new(
                    entry.name.clone(),
                    entry.path.clone(),
                    entry.is_folder,
                ));
                changed = true;
            }
        }
    }

    // Anything left in the map had no matching entry on disk.
    if !by_name.is_empty() {
        changed = true;
    }

    if !changed {
        let next_ids: Vec<(u64, String)> = next
            .iter()
            .map(|c| (c.id(), c.name.to_lowercase()))
            .collect();
        changed = next_ids != old_ids;
    }

    node.children = next;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_tree, list_directory};
    use std::fs;
    use tempfile::TempDir;

    fn ids(node: &FileNode) -> Vec<u64> {
        node.children.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn reconcile_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("media")).unwrap();
        fs::write(dir.path().join("mod.info"), "name=Test").unwrap();

        let mut tree = build_tree(dir.path()).unwrap();
        let listing = list_directory(dir.path()).unwrap();

        let first = reconcile(&mut tree, &listing);
        let before = ids(&tree);
        let second = reconcile(&mut tree, &listing);

        assert!(!first, "children already matched the listing");
        assert!(!second);
        assert_eq!(ids(&tree), before, "no node churn on repeat reconcile");
    }

    #[test]
    fn new_entries_become_new_nodes_and_missing_ones_are_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.lua"), "").unwrap();
        fs::write(dir.path().join("gone.lua"), "").unwrap();

        let mut tree = build_tree(dir.path()).unwrap();
        let keep_id = tree.child("keep.lua").unwrap().id();

        fs::remove_file(dir.path().join("gone.lua")).unwrap();
        fs::write(dir.path().join("fresh.txt"), "").unwrap();
        let listing = list_directory(dir.path()).unwrap();

        assert!(reconcile(&mut tree, &listing));
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.child("keep.lua").unwrap().id(), keep_id);
        assert!(tree.child("fresh.txt").is_some());
        assert!(tree.child("gone.lua").is_none());
    }

    #[test]
    fn reused_folder_keeps_its_subtree() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("media");
        fs::create_dir(&media).unwrap();
        fs::write(media.join("inner.lua"), "").unwrap();

        let mut tree = build_tree(dir.path()).unwrap();
        fs::write(dir.path().join("sibling.txt"), "").unwrap();
        let listing = list_directory(dir.path()).unwrap();

        assert!(reconcile(&mut tree, &listing));
        let media_node = tree.child("media").unwrap();
        assert_eq!(media_node.children.len(), 1, "subtree survived the refresh");
        assert!(media_node.child("inner.lua").is_some());
    }

    #[test]
    fn kind_flip_under_same_name_drops_stale_children() {
        let mut node = FileNode::new("root", "/r", true);
        let mut folder = FileNode::new("thing", "/r/thing", true);
        folder.children.push(FileNode::new("x", "/r/thing/x", false));
        node.children.push(folder);

        let listing = vec![DirEntry {
            name: "thing".into(),
            path: "/r/thing".into(),
            is_folder: false,
        }];
        assert!(reconcile(&mut node, &listing));
        let thing = node.child("thing").unwrap();
        assert!(!thing.is_folder);
        assert!(thing.children.is_empty());
    }
}
