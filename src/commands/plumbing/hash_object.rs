use crate::areas::repository::Repository;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use std::path::Path;

impl Repository {
    /// Id of `file`'s content as a blob, stored in the database when `write` is set.
    pub fn hash_object(&self, file: &Path, write: bool) -> anyhow::Result<ObjectId> {
        let file = self.workspace().relative_path(file)?;
        let blob = self.workspace().parse_blob(&file)?;

        if write {
            self.database().store(&blob)
        } else {
            blob.object_id()
        }
    }
}
