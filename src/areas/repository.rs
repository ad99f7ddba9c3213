//! Repository context
//!
//! A `Repository` bundles the areas rooted at one working tree. Every operation is a
//! method on it, so nothing ever looks up an implicit current repository.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::lock::RepositoryLock;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::codec::{Codec, ZlibCodec};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::snapshot::flatten::{FlatTree, flatten_tree};
use crate::errors::ArborError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name of the metadata directory at the root of the working tree
pub const METADATA_DIR: &str = ".arbor";

const OBJECTS_DIR: &str = "objects";
const INDEX_FILE: &str = "index";
const LOCK_FILE: &str = "lock";

#[derive(Debug)]
pub struct Repository {
    path: Box<Path>,
    index: Arc<Mutex<Index>>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
}

impl Repository {
    /// Repository context for the working tree at `path`, which must exist.
    ///
    /// The metadata directory is not required to exist yet, so this is also the
    /// entry point for `init`.
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        Self::with_codec(path, Box::new(ZlibCodec::default()))
    }

    pub fn with_codec(path: &Path, codec: Box<dyn Codec>) -> anyhow::Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Unable to resolve repository path {}", path.display()))?;
        let metadata_path = path.join(METADATA_DIR);

        Ok(Repository {
            index: Arc::new(Mutex::new(Index::new(
                metadata_path.join(INDEX_FILE).into_boxed_path(),
            ))),
            database: Database::with_codec(
                metadata_path.join(OBJECTS_DIR).into_boxed_path(),
                codec,
            ),
            workspace: Workspace::new(path.clone().into_boxed_path()),
            refs: Refs::new(metadata_path.into_boxed_path()),
            path: path.into_boxed_path(),
        })
    }

    /// Open the repository whose working tree contains `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let start = path
            .canonicalize()
            .with_context(|| format!("Unable to resolve path {}", path.display()))?;

        let root = start
            .ancestors()
            .find(|ancestor| ancestor.join(METADATA_DIR).is_dir())
            .ok_or_else(|| ArborError::NotARepository(start.clone()))?;

        Self::new(root)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_DIR)
    }

    pub fn index(&self) -> Arc<Mutex<Index>> {
        self.index.clone()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Take the cross-process repository lock.
    ///
    /// Callers hold the index mutex first: the lock is per process, so it does not
    /// keep two tasks of the same process apart.
    pub fn lock(&self) -> anyhow::Result<RepositoryLock> {
        RepositoryLock::acquire(&self.metadata_path().join(LOCK_FILE))
    }

    /// Root tree of the commit HEAD points at
    pub fn head_tree_oid(&self) -> anyhow::Result<Option<ObjectId>> {
        match self.refs.read_head()? {
            Some(oid) => self.commit_tree_oid(&oid).map(Some),
            None => Ok(None),
        }
    }

    pub fn commit_tree_oid(&self, commit_oid: &ObjectId) -> anyhow::Result<ObjectId> {
        Ok(self
            .database
            .parse_object_as_commit(commit_oid)?
            .tree_oid()
            .clone())
    }

    /// Every file of the commit HEAD points at; empty before the first commit
    pub fn head_files(&self) -> anyhow::Result<FlatTree> {
        match self.head_tree_oid()? {
            Some(tree_oid) => flatten_tree(&self.database, &tree_oid),
            None => Ok(FlatTree::new()),
        }
    }

    /// Every working tree file, hashed the way it would be stored
    pub fn workspace_files(&self) -> anyhow::Result<FlatTree> {
        self.workspace
            .list_files(None)?
            .into_iter()
            .map(|(path, mode)| {
                let oid = self.workspace.hash_file(&path)?;
                Ok((path, DatabaseEntry::new(oid, EntryMode::File(mode))))
            })
            .collect()
    }
}
