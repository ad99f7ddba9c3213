use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::snapshot::flatten::flatten_tree;
use crate::errors::ArborError;
use std::path::PathBuf;

impl Repository {
    /// Entries of the tree named by `object`, a tree id or anything naming a commit.
    ///
    /// With `recursive`, subtrees are expanded and only files are listed.
    pub fn ls_tree(
        &self,
        object: &str,
        recursive: bool,
    ) -> anyhow::Result<Vec<(PathBuf, DatabaseEntry)>> {
        let oid = self.resolve_object_id(object)?;
        let tree_oid = match self.database().load(&oid)? {
            ObjectBox::Commit(commit) => commit.tree_oid().clone(),
            ObjectBox::Tree(_) => oid,
            ObjectBox::Blob(_) => {
                return Err(ArborError::UnexpectedObjectType {
                    oid,
                    expected: ObjectType::Tree,
                    actual: ObjectType::Blob,
                }
                .into());
            }
        };

        if recursive {
            return Ok(flatten_tree(self.database(), &tree_oid)?.into_iter().collect());
        }

        Ok(self
            .database()
            .parse_object_as_tree(&tree_oid)?
            .into_entries()
            .map(|(name, entry)| (PathBuf::from(name), entry))
            .collect())
    }
}
