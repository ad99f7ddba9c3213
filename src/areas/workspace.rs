//! Working tree access
//!
//! Paths handed in and out of the workspace are relative to its root. The metadata
//! directory is never listed, read or written through here.

use crate::areas::atomic::write_atomic;
use crate::areas::repository::METADATA_DIR;
use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use is_executable::IsExecutable;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Files found in the working tree with their executable flag
pub type WorkspaceFiles = BTreeMap<PathBuf, FileMode>;

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_ignored(path: &Path) -> bool {
        path.components()
            .any(|component| component == Component::Normal(METADATA_DIR.as_ref()))
    }

    /// Turn a user-supplied path (absolute, or relative to the root) into a clean
    /// root-relative path.
    pub fn relative_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.path.join(path)
        };

        let mut relative = PathBuf::new();
        let stripped = absolute
            .strip_prefix(&self.path)
            .with_context(|| format!("{} is outside the repository", path.display()))?;
        for component in stripped.components() {
            match component {
                Component::Normal(name) => relative.push(name),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !relative.pop() {
                        anyhow::bail!("{} is outside the repository", path.display());
                    }
                }
                _ => anyhow::bail!("{} is not a plain path", path.display()),
            }
        }

        Ok(relative)
    }

    /// All regular files under `root` (the whole tree when `None`).
    ///
    /// A `root` naming a single file yields just that file; a missing `root` yields
    /// nothing. Symlinks, other special files and paths that are not valid UTF-8 are
    /// skipped.
    pub fn list_files(&self, root: Option<&Path>) -> anyhow::Result<WorkspaceFiles> {
        let root_path = match root {
            Some(root) => self.path.join(root),
            None => self.path.to_path_buf(),
        };

        let mut files = WorkspaceFiles::new();
        if !root_path.exists() {
            return Ok(files);
        }

        let walker = WalkDir::new(&root_path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != METADATA_DIR);
        for entry in walker {
            let entry = entry
                .with_context(|| format!("Unable to list files under {}", root_path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.path)
                .with_context(|| format!("{} escaped the repository", entry.path().display()))?;
            if Self::is_ignored(relative) {
                continue;
            }
            // tree and index names are UTF-8
            if relative.to_str().is_none() {
                warn!(path = %relative.display(), "skipping file with a non UTF-8 path");
                continue;
            }

            files.insert(
                relative.to_path_buf(),
                FileMode::from_executable(entry.path().is_executable()),
            );
        }

        Ok(files)
    }

    pub fn is_file(&self, file_path: &Path) -> bool {
        self.path.join(file_path).is_file()
    }

    pub fn is_dir(&self, file_path: &Path) -> bool {
        self.path.join(file_path).is_dir()
    }

    pub fn read_file(&self, file_path: &Path) -> anyhow::Result<Bytes> {
        let full_path = self.path.join(file_path);
        let content = std::fs::read(&full_path)
            .with_context(|| format!("Unable to read file {}", full_path.display()))?;

        Ok(Bytes::from(content))
    }

    pub fn parse_blob(&self, file_path: &Path) -> anyhow::Result<Blob> {
        Ok(Blob::new(self.read_file(file_path)?))
    }

    /// Id the file's content would have as a blob, without storing it
    pub fn hash_file(&self, file_path: &Path) -> anyhow::Result<ObjectId> {
        self.parse_blob(file_path)?.object_id()
    }

    /// Atomically write a file, creating parent directories and setting its mode.
    pub fn write_file(&self, file_path: &Path, content: &[u8], mode: FileMode) -> anyhow::Result<()> {
        let full_path = self.path.join(file_path);

        // only an empty directory may stand where the file goes
        if full_path.is_dir() {
            std::fs::remove_dir(&full_path)
                .with_context(|| format!("Unable to remove directory {}", full_path.display()))?;
        }
        for ancestor in file_path.ancestors().skip(1) {
            let ancestor = self.path.join(ancestor);
            if ancestor != *self.path && ancestor.is_file() {
                std::fs::remove_file(&ancestor)
                    .with_context(|| format!("Unable to remove file {}", ancestor.display()))?;
            }
        }

        let permissions = if mode.is_executable() { 0o755 } else { 0o644 };
        write_atomic(&full_path, content, permissions)
    }

    /// Remove a file and any directories left empty by its removal.
    pub fn delete_file(&self, file_path: &Path) -> anyhow::Result<()> {
        let full_path = self.path.join(file_path);

        match std::fs::remove_file(&full_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Unable to delete file {}", full_path.display()));
            }
        }

        self.prune_empty_dirs(file_path)
    }

    fn prune_empty_dirs(&self, file_path: &Path) -> anyhow::Result<()> {
        for parent in file_path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }

            let dir = self.path.join(parent);
            let is_empty = match std::fs::read_dir(&dir) {
                Ok(mut entries) => entries.next().is_none(),
                Err(_) => false,
            };
            if !is_empty {
                break;
            }

            std::fs::remove_dir(&dir)
                .with_context(|| format!("Unable to remove directory {}", dir.display()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct Fixture {
        _dir: tempfile::TempDir,
        workspace: Workspace,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join(METADATA_DIR).join("objects")).unwrap();
        std::fs::write(root.join(METADATA_DIR).join("HEAD"), "ref").unwrap();

        Fixture {
            _dir: dir,
            workspace: Workspace::new(root.into_boxed_path()),
        }
    }

    #[rstest]
    fn lists_files_with_modes_and_skips_metadata(fixture: Fixture) {
        let workspace = &fixture.workspace;
        workspace
            .write_file(Path::new("src/main.rs"), b"fn main() {}", FileMode::Regular)
            .unwrap();
        workspace
            .write_file(Path::new("run.sh"), b"#!/bin/sh", FileMode::Executable)
            .unwrap();

        let files = workspace.list_files(None).unwrap();
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec![
                (PathBuf::from("run.sh"), FileMode::Executable),
                (PathBuf::from("src/main.rs"), FileMode::Regular),
            ]
        );
    }

    #[cfg(unix)]
    #[rstest]
    fn skips_files_with_non_utf8_names(fixture: Fixture) {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let workspace = &fixture.workspace;
        workspace
            .write_file(Path::new("ok.txt"), b"ok", FileMode::Regular)
            .unwrap();
        let odd_name = OsStr::from_bytes(b"caf\xe9.txt");
        std::fs::write(workspace.path().join(odd_name), b"odd").unwrap();

        let files = workspace.list_files(None).unwrap();
        assert_eq!(
            files.into_keys().collect::<Vec<_>>(),
            vec![PathBuf::from("ok.txt")]
        );
    }

    #[rstest]
    fn deleting_last_file_prunes_parents(fixture: Fixture) {
        let workspace = &fixture.workspace;
        workspace
            .write_file(Path::new("a/b/c.txt"), b"c", FileMode::Regular)
            .unwrap();
        workspace
            .write_file(Path::new("a/keep.txt"), b"k", FileMode::Regular)
            .unwrap();

        workspace.delete_file(Path::new("a/b/c.txt")).unwrap();

        assert!(!workspace.is_dir(Path::new("a/b")));
        assert!(workspace.is_file(Path::new("a/keep.txt")));
    }

    #[rstest]
    fn file_replaces_directory_and_back(fixture: Fixture) {
        let workspace = &fixture.workspace;
        workspace
            .write_file(Path::new("x"), b"file", FileMode::Regular)
            .unwrap();
        workspace
            .write_file(Path::new("x/y"), b"nested", FileMode::Regular)
            .unwrap();
        assert_eq!(workspace.read_file(Path::new("x/y")).unwrap().as_ref(), b"nested");

        workspace.delete_file(Path::new("x/y")).unwrap();
        workspace
            .write_file(Path::new("x"), b"file again", FileMode::Regular)
            .unwrap();
        assert_eq!(workspace.read_file(Path::new("x")).unwrap().as_ref(), b"file again");
    }

    #[rstest]
    #[case("a/./b", "a/b")]
    #[case("a/../b", "b")]
    fn normalizes_relative_paths(fixture: Fixture, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            fixture.workspace.relative_path(Path::new(input)).unwrap(),
            PathBuf::from(expected)
        );
    }

    #[rstest]
    fn rejects_paths_outside_the_root(fixture: Fixture) {
        assert!(fixture.workspace.relative_path(Path::new("../outside")).is_err());
        assert!(fixture.workspace.relative_path(Path::new("/etc/passwd")).is_err());
    }
}
