use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::snapshot::flatten::FlatTree;
use crate::errors::ArborError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Repository {
    /// Stage the files at or beneath each of `paths`.
    ///
    /// Tracked files under a given path that are gone from the working tree are
    /// staged for deletion. A path that is neither on disk nor tracked fails with
    /// `UnknownPath` before anything is staged.
    pub async fn add(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        let _lock = self.lock()?;

        index.rehydrate()?;
        let head_files = self.head_files()?;

        let mut selections = Vec::with_capacity(paths.len());
        for path in paths {
            let path = self.workspace().relative_path(path)?;
            let on_disk = self.workspace().list_files(Some(&path))?;
            let tracked = tracked_under(&path, &head_files, &index);

            if on_disk.is_empty() && tracked.is_empty() {
                return Err(ArborError::UnknownPath(path).into());
            }
            selections.push((on_disk, tracked));
        }

        for (on_disk, tracked) in selections {
            for (file, mode) in &on_disk {
                let blob = self.workspace().parse_blob(file)?;
                let oid = self.database().store(&blob)?;
                stage_file(&mut index, &head_files, file.clone(), oid, *mode);
            }

            for missing in tracked.into_iter().filter(|path| !on_disk.contains_key(path)) {
                if head_files.contains_key(&missing) {
                    index.tombstone(missing);
                } else {
                    index.unstage(&missing);
                }
            }
        }

        debug!(entries = index.len(), "staged changes");
        index.write_updates()
    }
}

/// Paths at or beneath `path` known to HEAD or staged in the index
pub(crate) fn tracked_under(path: &Path, head_files: &FlatTree, index: &Index) -> BTreeSet<PathBuf> {
    let staged = index
        .entries()
        .filter(|entry| !entry.state.is_deleted())
        .map(|entry| entry.name);

    head_files
        .keys()
        .cloned()
        .chain(staged)
        .filter(|tracked| tracked.starts_with(path))
        .collect()
}

/// Record `file` in the index as a change against HEAD.
///
/// Content equal to HEAD's leaves no pending change. HEAD files the new file
/// displaces (a file where one of its directories goes, or files beneath it)
/// are staged for deletion.
fn stage_file(
    index: &mut Index,
    head_files: &FlatTree,
    file: PathBuf,
    oid: ObjectId,
    mode: FileMode,
) {
    let entry = DatabaseEntry::new(oid.clone(), EntryMode::File(mode));
    if head_files.get(&file) == Some(&entry) {
        index.unstage(&file);
        return;
    }

    let displaced = head_files
        .keys()
        .filter(|tracked| {
            *tracked != &file && (file.starts_with(tracked) || tracked.starts_with(&file))
        })
        .cloned()
        .collect::<Vec<_>>();

    index.stage(file, oid, mode);
    for path in displaced {
        index.tombstone(path);
    }
}
