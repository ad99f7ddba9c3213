use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::{MIN_PREFIX_LENGTH, Revision};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::ArborError;

impl Repository {
    /// Load any object by full id, unique id prefix or commit revision.
    pub fn cat_file(&self, object: &str) -> anyhow::Result<ObjectBox> {
        let oid = self.resolve_object_id(object)?;
        self.database().load(&oid)
    }

    /// Names resolve the way revisions do, branches first; unlike a revision, an
    /// id prefix here may name an object of any type.
    pub(crate) fn resolve_object_id(&self, object: &str) -> anyhow::Result<ObjectId> {
        let is_hex = object.chars().all(|c| c.is_ascii_hexdigit());
        if !is_hex || object.len() < MIN_PREFIX_LENGTH || object.len() > OBJECT_ID_LENGTH {
            return Revision::try_parse(object)?.resolve(self);
        }

        if let Ok(branch_name) = BranchName::try_parse(object.to_string()) {
            if let Some(oid) = self.refs().read_branch(&branch_name)? {
                return Ok(oid);
            }
        }

        let mut candidates = self.database().find_objects_by_prefix(object)?;
        match candidates.len() {
            0 => Revision::try_parse(object)?.resolve(self),
            1 => Ok(candidates.remove(0)),
            _ => Err(ArborError::AmbiguousObjectId {
                prefix: object.to_string(),
                candidates,
            }
            .into()),
        }
    }
}
