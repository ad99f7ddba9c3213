use crate::areas::refs::{HEAD_REF_NAME, HeadTarget};
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::snapshot::flatten::{FlatTree, flatten_tree};
use crate::errors::ArborError;
use tracing::{debug, info};

/// What a checkout did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub previous_head: HeadTarget,
    pub head: HeadTarget,
    /// Commit now checked out, `None` for a branch without commits
    pub oid: Option<ObjectId>,
    pub written: usize,
    pub deleted: usize,
}

impl Repository {
    /// Switch the working tree and HEAD to `target`.
    ///
    /// A branch name attaches HEAD to that branch; any other revision detaches HEAD
    /// at the commit it resolves to. The whole move is planned first and refused
    /// with `WorkingTreeConflict` if it would lose staged, modified or untracked
    /// content. Every blob to be written is then read and verified before the first
    /// file is touched, so a missing or corrupt object aborts with the working tree
    /// unchanged.
    pub async fn checkout(&self, target: &str) -> anyhow::Result<CheckoutSummary> {
        let index = self.index();
        let mut index = index.lock().await;
        let _lock = self.lock()?;

        index.rehydrate()?;
        let previous_head = self.refs().head()?;
        let (head, target_oid) = self.resolve_checkout_target(target)?;

        let current_files = self.head_files()?;
        let target_files = match &target_oid {
            Some(oid) => flatten_tree(self.database(), &self.commit_tree_oid(oid)?)?,
            None => FlatTree::new(),
        };
        let workspace_files = self.workspace_files()?;
        let staged = index.entries().map(|entry| entry.name).collect::<Vec<_>>();

        let migration = Migration::plan(
            &current_files,
            &target_files,
            &workspace_files,
            staged.iter().map(|path| path.as_path()),
        )
        .ensure_no_conflicts()?;
        debug!(
            writes = migration.writes().len(),
            deletes = migration.deletes().len(),
            "planned checkout"
        );

        let mut blobs = Vec::with_capacity(migration.writes().len());
        for (path, entry) in migration.writes() {
            let blob = self.database().parse_object_as_blob(&entry.oid)?;
            blobs.push((path, blob, FileMode::try_from(entry.mode)?));
        }

        for path in migration.deletes() {
            self.workspace().delete_file(path)?;
        }
        for (path, blob, mode) in &blobs {
            self.workspace().write_file(path, blob.content(), *mode)?;
        }

        self.refs().set_head(&head)?;
        index.clear();
        index.write_updates()?;
        info!(
            revision = %target,
            written = blobs.len(),
            deleted = migration.deletes().len(),
            "checked out"
        );

        Ok(CheckoutSummary {
            previous_head,
            head,
            oid: target_oid,
            written: blobs.len(),
            deleted: migration.deletes().len(),
        })
    }

    /// Create branch `name` at HEAD and attach HEAD to it; the working tree and index
    /// are left as they are.
    pub async fn checkout_new_branch(&self, name: &str) -> anyhow::Result<CheckoutSummary> {
        let index = self.index();
        let _index = index.lock().await;
        let _lock = self.lock()?;

        let branch_name = BranchName::try_parse(name.to_string())?;
        let previous_head = self.refs().head()?;
        let oid = self.refs().read_head()?;

        // on an unborn branch the new branch comes into being with the first commit
        if let Some(oid) = &oid {
            self.refs().create_branch(&branch_name, oid)?;
        } else if self.refs().read_branch(&branch_name)?.is_some() {
            return Err(ArborError::RefAlreadyExists(name.to_string()).into());
        }

        let head = HeadTarget::Branch(branch_name);
        self.refs().set_head(&head)?;

        Ok(CheckoutSummary {
            previous_head,
            head,
            oid,
            written: 0,
            deleted: 0,
        })
    }

    /// A branch with commits attaches HEAD; anything else resolves to a commit and
    /// detaches it. `HEAD` and the current branch keep HEAD attached, even before the
    /// branch's first commit.
    fn resolve_checkout_target(
        &self,
        target: &str,
    ) -> anyhow::Result<(HeadTarget, Option<ObjectId>)> {
        if target == HEAD_REF_NAME {
            if let HeadTarget::Branch(branch_name) = self.refs().head()? {
                let oid = self.refs().read_branch(&branch_name)?;
                return Ok((HeadTarget::Branch(branch_name), oid));
            }
        }

        if let Ok(branch_name) = BranchName::try_parse(target.to_string()) {
            if let Some(oid) = self.refs().read_branch(&branch_name)? {
                return Ok((HeadTarget::Branch(branch_name), Some(oid)));
            }
            if self.refs().is_current_branch(&branch_name)? {
                return Ok((HeadTarget::Branch(branch_name), None));
            }
        }

        let oid = Revision::try_parse(target)?.resolve(self)?;
        Ok((HeadTarget::Detached(oid.clone()), Some(oid)))
    }
}
