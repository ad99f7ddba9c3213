//! Staging area
//!
//! The index records pending changes relative to the tree of the commit HEAD points
//! at: a staged blob for a path, or a tombstone saying the path is to be dropped.
//! Paths the index does not mention carry over from HEAD unchanged, so the index is
//! empty right after a commit or checkout.
//!
//! The index is loaded at the start of every operation and written back, whole,
//! through a rename after every mutation.

use crate::areas::atomic::write_atomic;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::index::index_entry::{EntryState, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::objects::object::Packable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::ArborError;
use anyhow::Context;
use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::debug;

const INDEX_FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (`.arbor/index`)
    path: Box<Path>,
    entries: BTreeMap<PathBuf, EntryState>,
    /// Modified since loading
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the index from disk; a missing file is an empty index.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.changed = false;

        let index_file = match std::fs::File::open(self.path()) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Unable to open index {}", self.path.display()));
            }
        };

        let mut reader = Checksum::new(BufReader::new(index_file));
        let header = IndexHeader::read_from(&mut reader)?;

        let mut previous: Option<PathBuf> = None;
        for _ in 0..header.entries_count {
            let entry = IndexEntry::read_from(&mut reader)?;
            if previous.as_ref().is_some_and(|previous| *previous >= entry.name) {
                return Err(ArborError::CorruptIndex(format!(
                    "entry {} is out of order",
                    entry.name.display()
                ))
                .into());
            }

            previous = Some(entry.name.clone());
            self.entries.insert(entry.name, entry.state);
        }

        reader.verify()
    }

    /// Persist the index if anything changed since it was loaded.
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        if !self.changed {
            return Ok(());
        }

        let mut writer = Checksum::new(Vec::new());
        let header = IndexHeader::new(self.entries.len() as u32);
        writer.write_all(&header.serialize()?)?;

        for entry in self.entries() {
            writer.write_all(&entry.serialize()?)?;
        }

        let content = writer.write_checksum()?;
        write_atomic(&self.path, &content, INDEX_FILE_MODE)
            .with_context(|| format!("Unable to write index {}", self.path.display()))?;
        debug!(entries = self.entries.len(), "wrote index");

        self.changed = false;

        Ok(())
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&EntryState> {
        self.entries.get(path)
    }

    /// Stage `oid` at `path`, last write wins.
    ///
    /// Pending changes that would clash with a file at `path` (entries for its
    /// parent directories or for paths beneath it) are discarded.
    pub fn stage(&mut self, path: PathBuf, oid: ObjectId, mode: FileMode) {
        self.discard_conflicts(&path);
        self.entries.insert(path, EntryState::Staged { oid, mode });
        self.changed = true;
    }

    /// Record that `path` is to be dropped from the next commit.
    pub fn tombstone(&mut self, path: PathBuf) {
        self.entries.insert(path, EntryState::Deleted);
        self.changed = true;
    }

    /// Forget any pending change for `path`.
    pub fn unstage(&mut self, path: &Path) {
        if self.entries.remove(path).is_some() {
            self.changed = true;
        }
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.changed = true;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.entries
            .iter()
            .map(|(name, state)| IndexEntry::new(name.clone(), state.clone()))
    }

    fn discard_conflicts(&mut self, path: &Path) {
        let entry = IndexEntry::new(path.to_path_buf(), EntryState::Deleted);
        for parent in entry.parent_dirs() {
            if matches!(self.entries.get(parent), Some(EntryState::Staged { .. })) {
                self.entries.remove(parent);
            }
        }

        let children = self
            .entries
            .range::<Path, _>((Bound::Excluded(path), Bound::Unbounded))
            .take_while(|(name, _)| name.starts_with(path))
            .filter(|(_, state)| !state.is_deleted())
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        for child in children {
            self.entries.remove(&child);
        }
    }
}
