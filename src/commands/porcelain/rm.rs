use crate::areas::repository::Repository;
use crate::commands::porcelain::add::tracked_under;
use crate::errors::ArborError;
use std::path::PathBuf;
use tracing::debug;

impl Repository {
    /// Stage the removal of tracked files at or beneath each of `paths`.
    ///
    /// Files from HEAD get a deletion marker; files only staged so far are simply
    /// dropped from the index. Unless `cached` is set, the working files are
    /// deleted as well.
    pub async fn rm(&self, paths: &[PathBuf], cached: bool) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        let _lock = self.lock()?;

        index.rehydrate()?;
        let head_files = self.head_files()?;

        let mut removals = Vec::new();
        for path in paths {
            let path = self.workspace().relative_path(path)?;
            let tracked = tracked_under(&path, &head_files, &index);
            if tracked.is_empty() {
                return Err(ArborError::UnknownPath(path).into());
            }
            removals.extend(tracked);
        }

        for path in removals {
            if head_files.contains_key(&path) {
                index.tombstone(path.clone());
            } else {
                index.unstage(&path);
            }

            if !cached {
                self.workspace().delete_file(&path)?;
            }
            debug!(path = %path.display(), cached, "removed path");
        }

        index.write_updates()
    }
}
