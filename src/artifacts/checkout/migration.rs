//! Checkout migration planning
//!
//! For every path present in the current tree, the target tree or the working tree:
//!
//! 1. Paths the target leaves identical to the current tree are not touched, so
//!    local modifications to them survive the checkout.
//! 2. A changed tracked path is deleted or rewritten, unless its working copy has
//!    drifted from the current tree (`StaleFile`).
//! 3. A path the target writes over an untracked file, or over a directory holding
//!    untracked files, conflicts unless the content already matches
//!    (`UntrackedOverwritten`).
//!
//! Untracked files are never scheduled for deletion.

use crate::artifacts::checkout::conflict::ConflictType;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::snapshot::flatten::FlatTree;
use crate::errors::ArborError;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// Detected conflicts grouped by type
pub type ConflictsSet = BTreeMap<ConflictType, BTreeSet<PathBuf>>;

#[derive(Debug, Default)]
pub struct Migration {
    deletes: BTreeSet<PathBuf>,
    writes: BTreeMap<PathBuf, DatabaseEntry>,
    conflicts: ConflictsSet,
}

impl Migration {
    /// Plan the move from `current` to `target`.
    ///
    /// `workspace` holds every working file hashed as it would be stored, and
    /// `staged` the paths with pending index entries.
    pub fn plan<'p>(
        current: &FlatTree,
        target: &FlatTree,
        workspace: &FlatTree,
        staged: impl IntoIterator<Item = &'p Path>,
    ) -> Self {
        let mut migration = Migration::default();

        for path in staged {
            migration.conflict(ConflictType::StagedChanges, path);
        }

        let paths = current.keys().chain(target.keys()).collect::<BTreeSet<_>>();
        for path in paths {
            let current_entry = current.get(path);
            let target_entry = target.get(path);
            if current_entry == target_entry {
                continue;
            }

            let working_entry = workspace.get(path);
            match current_entry {
                Some(current_entry) => {
                    let drifted = working_entry != Some(current_entry);
                    if drifted && working_entry != target_entry {
                        migration.conflict(ConflictType::StaleFile, path);
                    }
                }
                None => {
                    if working_entry.is_some() && working_entry != target_entry {
                        migration.conflict(ConflictType::UntrackedOverwritten, path);
                    }
                }
            }

            match target_entry {
                Some(target_entry) => {
                    migration.check_untracked_in_the_way(path, current, workspace);
                    if working_entry != Some(target_entry) {
                        migration.writes.insert(path.clone(), target_entry.clone());
                    }
                }
                None => {
                    if working_entry.is_some() {
                        migration.deletes.insert(path.clone());
                    }
                }
            }
        }

        migration
    }

    /// Untracked files occupying a parent directory of `path` or living beneath it
    fn check_untracked_in_the_way(&mut self, path: &Path, current: &FlatTree, workspace: &FlatTree) {
        for parent in path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }
            if workspace.contains_key(parent) && !current.contains_key(parent) {
                self.conflict(ConflictType::UntrackedOverwritten, parent);
            }
        }

        let beneath = workspace
            .range::<Path, _>((Bound::Excluded(path), Bound::Unbounded))
            .map(|(child, _)| child)
            .take_while(|child| child.starts_with(path))
            .filter(|child| !current.contains_key(*child))
            .cloned()
            .collect::<Vec<_>>();
        for child in beneath {
            self.conflict(ConflictType::UntrackedOverwritten, &child);
        }
    }

    fn conflict(&mut self, conflict_type: ConflictType, path: &Path) {
        self.conflicts
            .entry(conflict_type)
            .or_default()
            .insert(path.to_path_buf());
    }

    pub fn deletes(&self) -> &BTreeSet<PathBuf> {
        &self.deletes
    }

    pub fn writes(&self) -> &BTreeMap<PathBuf, DatabaseEntry> {
        &self.writes
    }

    pub fn conflicts(&self) -> &ConflictsSet {
        &self.conflicts
    }

    /// Fail with `WorkingTreeConflict` if planning found any conflict
    pub fn ensure_no_conflicts(self) -> anyhow::Result<Self> {
        if self.conflicts.is_empty() {
            return Ok(self);
        }

        let conflicts = self
            .conflicts
            .into_iter()
            .map(|(conflict_type, paths)| (conflict_type, paths.into_iter().collect()))
            .collect();

        Err(ArborError::WorkingTreeConflict(conflicts).into())
    }
}
