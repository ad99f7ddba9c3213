use anyhow::Context;
use file_guard::{FileGuard, Lock};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Exclusive advisory lock on the repository's lock file.
///
/// Held for the whole of a mutating operation so two processes cannot interleave
/// their HEAD, ref and index updates. Released on drop.
#[derive(Debug)]
pub struct RepositoryLock {
    _guard: FileGuard<Box<File>>,
}

impl RepositoryLock {
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Unable to open lock file {}", path.display()))?;

        let guard = file_guard::lock(Box::new(file), Lock::Exclusive, 0, 1)
            .with_context(|| format!("Unable to lock {}", path.display()))?;
        debug!(path = %path.display(), "acquired repository lock");

        Ok(RepositoryLock { _guard: guard })
    }
}
