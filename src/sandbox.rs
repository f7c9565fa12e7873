//! Materialization of mount descriptors onto a sandbox.
//!
//! The session hands a [`MountTree`] to whatever sandbox it was given and
//! never looks at the result. [`DirSandbox`] is the disk-backed
//! implementation the CLI uses; tests substitute recording doubles.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::mount::{MountNode, MountTree};

/// Name of the session state directory the sweep must never touch.
pub const STATE_DIR: &str = ".sitesmith";

/// Target for a synthesized project.
///
/// `mount` is authoritative: afterwards the sandbox holds exactly the
/// descriptor's files, and entries left over from an earlier mount are gone.
pub trait Sandbox {
    fn mount(&mut self, tree: &MountTree) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

/// Sandbox backed by a plain directory on disk.
pub struct DirSandbox {
    root: PathBuf,
}

impl DirSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Remove everything under the root that the descriptor does not name,
    /// plus entries whose kind flipped since the last mount. Skips the
    /// state directory at `<root>/.sitesmith`.
    fn sweep_stale(&self, expected: &BTreeMap<PathBuf, EntryKind>) -> Result<()> {
        let state_dir = self.root.join(STATE_DIR);

        // Bottom-up walk, so stale files go before their directories.
        for entry in WalkDir::new(&self.root).min_depth(1).contents_first(true) {
            let entry = entry.context("Failed to walk output directory")?;
            let path = entry.path();
            if path.starts_with(&state_dir) {
                continue;
            }

            let on_disk = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            if expected.get(path) == Some(&on_disk) {
                continue;
            }

            debug!("Removing stale entry {}", path.display());
            if on_disk == EntryKind::Dir {
                fs::remove_dir_all(path).with_context(|| {
                    format!("Failed to remove stale directory {}", path.display())
                })?;
            } else {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove stale file {}", path.display()))?;
            }
        }
        Ok(())
    }

    fn write_level(&self, dir: &Path, level: &MountTree) -> Result<()> {
        for (name, node) in level {
            let target = dir.join(name);
            match node {
                MountNode::File { file } => {
                    fs::write(&target, &file.contents)
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                }
                MountNode::Directory { directory } => {
                    fs::create_dir_all(&target).with_context(|| {
                        format!("Failed to create directory {}", target.display())
                    })?;
                    self.write_level(&target, directory)?;
                }
            }
        }
        Ok(())
    }
}

impl Sandbox for DirSandbox {
    fn mount(&mut self, tree: &MountTree) -> Result<()> {
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create output directory {}", self.root.display())
        })?;

        let mut expected = BTreeMap::new();
        collect_expected(&self.root, tree, &mut expected)?;

        self.sweep_stale(&expected)?;
        self.write_level(&self.root, tree)?;

        debug!(
            "Mounted {} entries into {}",
            expected.len(),
            self.root.display()
        );
        Ok(())
    }
}

/// Flatten the descriptor into absolute paths with their kinds, rejecting
/// names that would write outside the root.
fn collect_expected(
    dir: &Path,
    level: &MountTree,
    out: &mut BTreeMap<PathBuf, EntryKind>,
) -> Result<()> {
    for (name, node) in level {
        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            anyhow::bail!("Refusing to mount entry with unsafe name: {:?}", name);
        }
        let target = dir.join(name);
        match node {
            MountNode::File { .. } => {
                out.insert(target, EntryKind::File);
            }
            MountNode::Directory { directory } => {
                out.insert(target.clone(), EntryKind::Dir);
                collect_expected(&target, directory, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::project;
    use crate::steps::Step;
    use crate::tree::synthesize;
    use tempfile::TempDir;

    fn mount_of(steps: &[Step]) -> MountTree {
        project(&synthesize(steps))
    }

    #[test]
    fn test_mount_writes_files_and_folders() {
        let temp_dir = TempDir::new().unwrap();
        let mut sandbox = DirSandbox::new(temp_dir.path());

        let steps = vec![
            Step::create_file(0, "src/a.txt".to_string(), "hello".to_string()),
            Step::create_file(1, "index.html".to_string(), "<!doctype html>".to_string()),
            Step::create_folder(2, "public".to_string()),
        ];
        sandbox.mount(&mount_of(&steps)).unwrap();

        let a = fs::read_to_string(temp_dir.path().join("src/a.txt")).unwrap();
        assert_eq!(a, "hello");
        let index = fs::read_to_string(temp_dir.path().join("index.html")).unwrap();
        assert_eq!(index, "<!doctype html>");
        assert!(temp_dir.path().join("public").is_dir());
    }

    #[test]
    fn test_remount_removes_stale_entries() {
        let temp_dir = TempDir::new().unwrap();
        let mut sandbox = DirSandbox::new(temp_dir.path());

        let first = vec![
            Step::create_file(0, "old.txt".to_string(), "old".to_string()),
            Step::create_file(1, "src/keep.txt".to_string(), "keep".to_string()),
        ];
        sandbox.mount(&mount_of(&first)).unwrap();

        let second = vec![Step::create_file(0, "src/keep.txt".to_string(), "keep".to_string())];
        sandbox.mount(&mount_of(&second)).unwrap();

        assert!(!temp_dir.path().join("old.txt").exists());
        assert!(temp_dir.path().join("src/keep.txt").is_file());
    }

    #[test]
    fn test_remount_replaces_dir_with_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut sandbox = DirSandbox::new(temp_dir.path());

        let first = vec![Step::create_file(0, "a/inner.txt".to_string(), "x".to_string())];
        sandbox.mount(&mount_of(&first)).unwrap();
        assert!(temp_dir.path().join("a").is_dir());

        let second = vec![Step::create_file(0, "a".to_string(), "now a file".to_string())];
        sandbox.mount(&mount_of(&second)).unwrap();

        let a = temp_dir.path().join("a");
        assert!(a.is_file());
        assert_eq!(fs::read_to_string(a).unwrap(), "now a file");
    }

    #[test]
    fn test_sweep_leaves_state_dir_alone() {
        let temp_dir = TempDir::new().unwrap();
        let state = temp_dir.path().join(STATE_DIR);
        fs::create_dir_all(&state).unwrap();
        fs::write(state.join("session.json"), "{}").unwrap();

        let mut sandbox = DirSandbox::new(temp_dir.path());
        let steps = vec![Step::create_file(0, "index.html".to_string(), "hi".to_string())];
        sandbox.mount(&mount_of(&steps)).unwrap();

        assert!(state.join("session.json").is_file());
        assert!(temp_dir.path().join("index.html").is_file());
    }

    #[test]
    fn test_unsafe_names_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut sandbox = DirSandbox::new(temp_dir.path());

        let mut tree = MountTree::new();
        tree.insert(
            "..".to_string(),
            MountNode::File {
                file: crate::mount::FileContents {
                    contents: "escape".to_string(),
                },
            },
        );
        assert!(sandbox.mount(&tree).is_err());
    }

    #[test]
    fn test_mount_overwrites_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let mut sandbox = DirSandbox::new(temp_dir.path());

        let first = vec![Step::create_file(0, "index.html".to_string(), "v1".to_string())];
        sandbox.mount(&mount_of(&first)).unwrap();

        let second = vec![Step::create_file(0, "index.html".to_string(), "v2".to_string())];
        sandbox.mount(&mount_of(&second)).unwrap();

        let body = fs::read_to_string(temp_dir.path().join("index.html")).unwrap();
        assert_eq!(body, "v2");
    }
}
