use crate::areas::refs::HEAD_REF_NAME;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::objects::object_id::ObjectId;
use tracing::info;

/// A branch with the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: BranchName,
    pub oid: ObjectId,
    pub is_current: bool,
}

impl Repository {
    /// Create `name` at `start_point` (HEAD by default) without switching to it.
    pub async fn create_branch(
        &self,
        name: &str,
        start_point: Option<&str>,
    ) -> anyhow::Result<ObjectId> {
        let index = self.index();
        let _index = index.lock().await;
        let _lock = self.lock()?;

        let branch_name = BranchName::try_parse(name.to_string())?;
        let revision = Revision::try_parse(start_point.unwrap_or(HEAD_REF_NAME))?;
        let oid = revision.resolve(self)?;

        self.refs().create_branch(&branch_name, &oid)?;
        info!(branch = %branch_name, %oid, "created branch");

        Ok(oid)
    }

    /// Delete `name`, returning the commit it pointed at.
    pub async fn delete_branch(&self, name: &str) -> anyhow::Result<ObjectId> {
        let index = self.index();
        let _index = index.lock().await;
        let _lock = self.lock()?;

        let branch_name = BranchName::try_parse(name.to_string())?;
        self.refs().delete_branch(&branch_name)
    }

    /// Branches that point at a commit, sorted by name
    pub fn list_branches(&self) -> anyhow::Result<Vec<BranchInfo>> {
        let current = self.refs().current_branch()?;

        let mut branches = Vec::new();
        for name in self.refs().list_branches()? {
            if let Some(oid) = self.refs().read_branch(&name)? {
                branches.push(BranchInfo {
                    is_current: current.as_ref() == Some(&name),
                    name,
                    oid,
                });
            }
        }

        Ok(branches)
    }
}
