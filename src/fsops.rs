//! Robust filesystem helpers: recursive copy, read-only clearing, retrying
//! removal.
//!
//! Deletion in particular has to cope with transient locks (editors,
//! indexers, antivirus holding handles), so every removal retries a bounded
//! number of times with a fixed backoff; an item that never lets go is logged
//! as a warning and skipped so a subtree delete keeps going instead of
//! aborting wholesale.

use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use walkdir::WalkDir;

use crate::cancel::CancelToken;

/// Copy a directory tree byte-for-byte.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Clear read-only attributes on `path` and everything under it.
///
/// Best-effort: an entry whose permissions cannot be changed is left alone
/// and the subsequent removal retry deals with it.
pub fn clear_readonly_recursive(path: &Path) {
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if let Ok(metadata) = entry.metadata() {
            let mut permissions = metadata.permissions();
            if permissions.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                permissions.set_readonly(false);
                let _ = std::fs::set_permissions(entry.path(), permissions);
            }
        }
    }
}

/// Run one removal closure with bounded retries and fixed backoff.
///
/// The final attempt surfaces the real error. A fired cancellation token
/// stops retrying early and reports `Interrupted`.
fn retry_remove<F>(
    attempts: u32,
    backoff: Duration,
    token: Option<&CancelToken>,
    mut op: F,
) -> io::Result<()>
where
    F: FnMut() -> io::Result<()>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match op() {
            Ok(()) => return Ok(()),
            Err(err) if attempt == attempts => return Err(err),
            Err(_) => {
                if token.is_some_and(CancelToken::is_cancelled) {
                    return Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "removal cancelled",
                    ));
                }
                std::thread::sleep(backoff);
            }
        }
    }
    unreachable!("retry loop always returns")
}

/// Remove a file or a whole directory tree, retrying transient failures.
///
/// Read-only attributes are cleared first. For directories the contents are
/// walked deepest-first and each entry is removed independently: an entry
/// that survives all retries is logged and skipped, and only a root that is
/// still present at the end turns into an error.
pub fn remove_path_robust(
    path: &Path,
    attempts: u32,
    backoff: Duration,
    token: Option<&CancelToken>,
) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    clear_readonly_recursive(path);

    if path.is_file() || path.is_symlink() {
        return retry_remove(attempts, backoff, token, || std::fs::remove_file(path));
    }

    for entry in WalkDir::new(path)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if token.is_some_and(CancelToken::is_cancelled) {
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "removal cancelled",
            ));
        }
        let entry_path = entry.path();
        let result = if entry.file_type().is_dir() {
            retry_remove(attempts, backoff, token, || {
                std::fs::remove_dir(entry_path)
            })
        } else {
            retry_remove(attempts, backoff, token, || {
                std::fs::remove_file(entry_path)
            })
        };
        if let Err(err) = result {
            warn!(path = %entry_path.display(), %err, "could not remove entry, skipping");
        }
    }

    if path.exists() {
        return Err(io::Error::other(format!(
            "directory not fully removed: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn copy_dir_recursive_preserves_bytes() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let nested = src.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("f.lua"), b"-- content").unwrap();
        fs::write(src.join("top.txt"), b"top").unwrap();

        let dst = dir.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        assert_eq!(
            fs::read(dst.join("a").join("b").join("f.lua")).unwrap(),
            b"-- content"
        );
        assert_eq!(fs::read(dst.join("top.txt")).unwrap(), b"top");
    }

    #[test]
    fn remove_path_robust_clears_readonly_tree() {
        let dir = TempDir::new().unwrap();
        let victim = dir.path().join("victim");
        fs::create_dir(&victim).unwrap();
        let file = victim.join("locked.txt");
        fs::write(&file, "x").unwrap();
        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();

        remove_path_robust(&victim, 3, Duration::from_millis(5), None).unwrap();
        assert!(!victim.exists());
    }

    #[test]
    fn remove_path_robust_on_missing_path_is_ok() {
        let dir = TempDir::new().unwrap();
        remove_path_robust(
            &dir.path().join("nope"),
            3,
            Duration::from_millis(5),
            None,
        )
        .unwrap();
    }
}
