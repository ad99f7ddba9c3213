use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::EntryState;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::snapshot::builder::TreeBuilder;
use crate::errors::ArborError;
use tracing::info;

impl Repository {
    /// Record the staged changes as a new commit on top of HEAD.
    ///
    /// The tree is built from HEAD's tree with the index applied; directories the
    /// index does not touch keep their ids. The branch HEAD is attached to moves to
    /// the new commit, or HEAD itself when detached, and the index is cleared.
    ///
    /// Fails with `NothingToCommit`, leaving the index alone, when nothing is staged
    /// or the staged changes add up to HEAD's tree.
    pub async fn commit(&self, message: &str, author: Author) -> anyhow::Result<ObjectId> {
        let index = self.index();
        let mut index = index.lock().await;
        let _lock = self.lock()?;

        index.rehydrate()?;
        if index.is_empty() {
            return Err(ArborError::NothingToCommit.into());
        }

        let parent = self.refs().read_head()?;
        let base_tree = match &parent {
            Some(parent) => Some(self.commit_tree_oid(parent)?),
            None => None,
        };

        let mut builder = TreeBuilder::new(self.database(), base_tree.as_ref())?;
        for entry in index.entries() {
            match entry.state {
                EntryState::Staged { oid, mode } => {
                    if !self.database().exists(&oid) {
                        return Err(ArborError::ObjectNotFound(oid).into());
                    }
                    builder.stage(&entry.name, DatabaseEntry::new(oid, mode.into()))?;
                }
                EntryState::Deleted => builder.remove(&entry.name)?,
            }
        }

        let tree_oid = builder.build()?;
        if base_tree.as_ref() == Some(&tree_oid) {
            return Err(ArborError::NothingToCommit.into());
        }

        let parents = parent.into_iter().collect::<Vec<_>>();
        let commit = Commit::new(parents, tree_oid, author, message.trim().to_string());
        let commit_oid = self.database().store(&commit)?;

        self.refs().update_head(&commit_oid)?;
        index.clear();
        index.write_updates()?;
        info!(oid = %commit_oid, tree = %commit.tree_oid(), "created commit");

        Ok(commit_oid)
    }
}
