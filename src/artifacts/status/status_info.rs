//! Three-way status comparison
//!
//! Each path is looked up in HEAD's tree, in the index and in the working tree. The
//! index only records pending changes, so the content a path would be committed with
//! is its index entry when there is one and its HEAD entry otherwise.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryState, IndexEntry};
use crate::artifacts::snapshot::flatten::FlatTree;
use crate::artifacts::status::file_change::{FileChange, IndexChange, WorkspaceChange};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub type FileSet = BTreeSet<PathBuf>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub untracked: FileSet,
    pub modified_unstaged: FileSet,
    pub deleted_unstaged: FileSet,
    pub staged_new: FileSet,
    pub staged_modified: FileSet,
    pub staged_deleted: FileSet,
    pub unmodified: FileSet,
}

impl StatusReport {
    /// Compare `head`, the pending index entries and the hashed working tree.
    pub fn compute(
        head: &FlatTree,
        index_entries: impl IntoIterator<Item = IndexEntry>,
        workspace: &FlatTree,
    ) -> Self {
        let mut report = StatusReport::default();
        let mut next_commit = head
            .iter()
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect::<BTreeMap<PathBuf, DatabaseEntry>>();

        for entry in index_entries {
            let in_head = head.get(&entry.name);
            match entry.state {
                EntryState::Staged { oid, mode } => {
                    let staged = DatabaseEntry::new(oid, mode.into());
                    match in_head {
                        None => {
                            report.staged_new.insert(entry.name.clone());
                        }
                        Some(head_entry) if *head_entry != staged => {
                            report.staged_modified.insert(entry.name.clone());
                        }
                        Some(_) => {}
                    }
                    next_commit.insert(entry.name, staged);
                }
                EntryState::Deleted => {
                    if in_head.is_some() {
                        report.staged_deleted.insert(entry.name.clone());
                    }
                    next_commit.remove(&entry.name);
                }
            }
        }

        for (path, expected) in &next_commit {
            match workspace.get(path) {
                None => {
                    report.deleted_unstaged.insert(path.clone());
                }
                Some(actual) if actual != expected => {
                    report.modified_unstaged.insert(path.clone());
                }
                Some(_) => {
                    if !report.is_staged(path) {
                        report.unmodified.insert(path.clone());
                    }
                }
            }
        }

        report.untracked = workspace
            .keys()
            .filter(|path| !next_commit.contains_key(*path))
            .cloned()
            .collect();

        report
    }

    fn is_staged(&self, path: &PathBuf) -> bool {
        self.staged_new.contains(path)
            || self.staged_modified.contains(path)
            || self.staged_deleted.contains(path)
    }

    pub fn is_clean(&self) -> bool {
        self.changes().is_empty() && self.untracked.is_empty()
    }

    /// Every tracked path with a staged or unstaged change
    pub fn changes(&self) -> BTreeMap<PathBuf, FileChange> {
        let mut changes = BTreeMap::<PathBuf, FileChange>::new();

        let staged = [
            (&self.staged_new, IndexChange::Added),
            (&self.staged_modified, IndexChange::Modified),
            (&self.staged_deleted, IndexChange::Deleted),
        ];
        for (paths, change) in staged {
            for path in paths {
                changes.entry(path.clone()).or_default().index = change;
            }
        }

        let unstaged = [
            (&self.modified_unstaged, WorkspaceChange::Modified),
            (&self.deleted_unstaged, WorkspaceChange::Deleted),
        ];
        for (paths, change) in unstaged {
            for path in paths {
                changes.entry(path.clone()).or_default().workspace = change;
            }
        }

        changes
    }
}
