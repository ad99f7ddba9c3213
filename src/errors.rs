//! Error kinds surfaced by repository operations
//!
//! Operations return `anyhow::Result`; when a failure is one of the kinds below it is
//! the root cause of the returned error and can be recovered with
//! `err.downcast_ref::<ArborError>()`. Plain I/O failures are reported with context
//! naming the path involved.

use crate::artifacts::checkout::conflict::ConflictType;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArborError {
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("integrity error: object {expected} hashes to {actual}")]
    IntegrityError { expected: ObjectId, actual: ObjectId },

    #[error("corrupt object {oid}: {reason}")]
    CorruptObject { oid: ObjectId, reason: String },

    #[error("malformed {kind} object: {reason}")]
    MalformedObject { kind: &'static str, reason: String },

    #[error("object {oid} is a {actual}, expected a {expected}")]
    UnexpectedObjectType {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("unknown ref {0}")]
    UnknownRef(String),

    #[error("a branch named '{0}' already exists")]
    RefAlreadyExists(String),

    #[error("'{0}' is not a valid branch name")]
    InvalidBranchName(String),

    #[error("short object id {prefix} is ambiguous: {candidates:?}")]
    AmbiguousObjectId {
        prefix: String,
        candidates: Vec<ObjectId>,
    },

    #[error("nothing to commit, working tree clean")]
    NothingToCommit,

    #[error("checkout would lose local changes:\n{}", render_conflicts(.0))]
    WorkingTreeConflict(BTreeMap<ConflictType, Vec<PathBuf>>),

    #[error("pathspec '{0}' did not match any files")]
    UnknownPath(PathBuf),

    #[error("index file is corrupt: {0}")]
    CorruptIndex(String),

    #[error("not an arbor repository: {0}")]
    NotARepository(PathBuf),

    #[error("repository already exists in {0}")]
    RepositoryAlreadyExists(PathBuf),

    #[error("cannot delete branch '{0}' checked out at HEAD")]
    DeleteCurrentBranch(String),
}

fn render_conflicts(conflicts: &BTreeMap<ConflictType, Vec<PathBuf>>) -> String {
    conflicts
        .iter()
        .map(|(conflict_type, paths)| {
            let paths = paths
                .iter()
                .map(|path| format!("\t{}", path.display()))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{}\n{}\n{}",
                conflict_type.header(),
                paths,
                conflict_type.footer()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl ArborError {
    /// Build a `MalformedObject` error for the given object kind.
    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        ArborError::MalformedObject {
            kind,
            reason: reason.into(),
        }
    }
}
