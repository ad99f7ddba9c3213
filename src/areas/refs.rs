//! References (branches and HEAD)
//!
//! References are human-readable names pointing at commits:
//! - Branches: `refs/heads/<name>`, each file holding a 40-character commit id
//! - HEAD: either `ref: refs/heads/<name>` (attached) or a bare commit id (detached)
//!
//! Every update replaces the whole file through a rename, so concurrent readers see
//! either the old or the new value and never a torn one.

use crate::areas::atomic::write_atomic;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::ArborError;
use anyhow::Context;
use derive_new::new;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: refs/heads/(.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

const REF_FILE_MODE: u32 = 0o644;

/// What HEAD points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadTarget {
    /// Attached to a branch, which may not have any commit yet
    Branch(BranchName),
    /// Detached at a commit
    Detached(ObjectId),
}

impl HeadTarget {
    fn read(path: &Path) -> anyhow::Result<HeadTarget> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        match symref_match {
            Some(symref_match) => Ok(HeadTarget::Branch(BranchName::try_parse(
                symref_match[1].to_string(),
            )?)),
            None => Ok(HeadTarget::Detached(
                ObjectId::try_parse(content.to_string())
                    .with_context(|| format!("invalid HEAD content {content:?}"))?,
            )),
        }
    }

    fn to_file_content(&self) -> String {
        match self {
            HeadTarget::Branch(branch) => format!("ref: {}\n", branch.to_ref_path()),
            HeadTarget::Detached(oid) => format!("{oid}\n"),
        }
    }
}

/// Branch and HEAD manager rooted at the metadata directory
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

impl Refs {
    pub fn head(&self) -> anyhow::Result<HeadTarget> {
        HeadTarget::read(&self.head_path())
    }

    /// Branch HEAD is attached to, `None` when detached
    pub fn current_branch(&self) -> anyhow::Result<Option<BranchName>> {
        match self.head()? {
            HeadTarget::Branch(branch) => Ok(Some(branch)),
            HeadTarget::Detached(_) => Ok(None),
        }
    }

    pub fn is_current_branch(&self, branch_name: &BranchName) -> anyhow::Result<bool> {
        Ok(self.current_branch()?.as_ref() == Some(branch_name))
    }

    /// Commit HEAD resolves to; `None` on a branch without commits
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        match self.head()? {
            HeadTarget::Branch(branch) => self.read_branch(&branch),
            HeadTarget::Detached(oid) => Ok(Some(oid)),
        }
    }

    pub fn read_branch(&self, branch_name: &BranchName) -> anyhow::Result<Option<ObjectId>> {
        let ref_path = self.branch_path(branch_name);

        match std::fs::read_to_string(&ref_path) {
            Ok(content) => Ok(Some(ObjectId::try_parse(content.trim().to_string()).with_context(
                || format!("invalid ref content in {}", ref_path.display()),
            )?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::IsADirectory => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read ref file at {:?}", ref_path)),
        }
    }

    /// Resolve `HEAD` or a branch name to a commit id
    pub fn resolve(&self, name: &str) -> anyhow::Result<ObjectId> {
        let oid = if name == HEAD_REF_NAME {
            self.read_head()?
        } else {
            let branch_name = BranchName::try_parse(name.to_string())
                .map_err(|_| ArborError::UnknownRef(name.to_string()))?;
            self.read_branch(&branch_name)?
        };

        oid.ok_or_else(|| ArborError::UnknownRef(name.to_string()).into())
    }

    /// Point a branch at `oid`, creating it if needed; last writer wins
    pub fn update_ref(&self, branch_name: &BranchName, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(&self.branch_path(branch_name), format!("{oid}\n"))?;
        debug!(branch = %branch_name, %oid, "updated branch");

        Ok(())
    }

    /// Move whatever HEAD designates to `oid`: the attached branch, or HEAD itself
    pub fn update_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        match self.head()? {
            HeadTarget::Branch(branch) => self.update_ref(&branch, oid),
            HeadTarget::Detached(_) => self.set_head(&HeadTarget::Detached(oid.clone())),
        }
    }

    pub fn set_head(&self, target: &HeadTarget) -> anyhow::Result<()> {
        self.update_ref_file(&self.head_path(), target.to_file_content())?;
        info!(head = %target.to_file_content().trim(), "moved HEAD");

        Ok(())
    }

    pub fn create_branch(&self, name: &BranchName, source_oid: &ObjectId) -> anyhow::Result<()> {
        let branch_path = self.branch_path(name);

        if branch_path.exists() || self.conflicts_with_existing(name) {
            return Err(ArborError::RefAlreadyExists(name.to_string()).into());
        }

        self.update_ref(name, source_oid)
    }

    /// Delete a branch other than the current one, returning the commit it pointed at
    pub fn delete_branch(&self, name: &BranchName) -> anyhow::Result<ObjectId> {
        if self.is_current_branch(name)? {
            return Err(ArborError::DeleteCurrentBranch(name.to_string()).into());
        }

        let oid = self
            .read_branch(name)?
            .ok_or_else(|| ArborError::UnknownRef(name.to_string()))?;
        let branch_path = self.branch_path(name);

        std::fs::remove_file(&branch_path)
            .with_context(|| format!("failed to delete branch file at {:?}", branch_path))?;
        self.prune_branch_empty_parent_dirs(&branch_path)?;
        info!(branch = %name, %oid, "deleted branch");

        Ok(oid)
    }

    /// All branches, sorted by name
    pub fn list_branches(&self) -> anyhow::Result<Vec<BranchName>> {
        let heads_path = self.heads_path();
        let mut branches = Vec::new();

        for entry in WalkDir::new(&heads_path).into_iter().filter_map(|entry| entry.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let relative_path = entry.path().strip_prefix(&heads_path)?;
            let name = relative_path
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            // skip leftovers such as interrupted temporary files
            if let Ok(branch) = BranchName::try_parse(name) {
                branches.push(branch);
            }
        }
        branches.sort();

        Ok(branches)
    }

    /// `a/b` cannot coexist with a branch `a`, nor `a` with `a/b`
    fn conflicts_with_existing(&self, name: &BranchName) -> bool {
        let branch_path = self.branch_path(name);
        let heads_path = self.heads_path();

        branch_path.is_dir()
            || branch_path
                .ancestors()
                .skip(1)
                .take_while(|ancestor| *ancestor != heads_path)
                .any(|ancestor| ancestor.is_file())
    }

    fn update_ref_file(&self, path: &Path, raw_ref: String) -> anyhow::Result<()> {
        write_atomic(path, raw_ref.as_bytes(), REF_FILE_MODE)
            .with_context(|| format!("failed to write ref file at {:?}", path))
    }

    fn prune_branch_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        let heads_path = self.heads_path();

        for parent in path.ancestors().skip(1) {
            if parent == heads_path || parent.read_dir()?.next().is_some() {
                break;
            }

            std::fs::remove_dir(parent).with_context(|| {
                format!("failed to remove empty branch directory at {:?}", parent)
            })?;
        }

        Ok(())
    }

    fn branch_path(&self, name: &BranchName) -> PathBuf {
        self.path.join(name.to_ref_path())
    }

    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    pub fn heads_path(&self) -> PathBuf {
        self.path.join("refs").join("heads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::codec;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    struct Fixture {
        _dir: tempfile::TempDir,
        refs: Refs,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let refs = Refs::new(dir.path().to_path_buf().into_boxed_path());
        refs.set_head(&HeadTarget::Branch(branch("master"))).unwrap();

        Fixture { _dir: dir, refs }
    }

    fn branch(name: &str) -> BranchName {
        BranchName::try_parse(name.to_string()).unwrap()
    }

    #[rstest]
    fn unborn_branch_has_no_head_commit(fixture: Fixture) {
        assert_eq!(fixture.refs.read_head().unwrap(), None);

        let err = fixture.refs.resolve("HEAD").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::UnknownRef(_))
        ));
    }

    #[rstest]
    fn update_head_moves_the_attached_branch(fixture: Fixture) {
        let oid = codec::hash(b"commit");
        fixture.refs.update_head(&oid).unwrap();

        assert_eq!(fixture.refs.read_branch(&branch("master")).unwrap(), Some(oid.clone()));
        assert_eq!(fixture.refs.resolve("HEAD").unwrap(), oid);
        assert_eq!(
            std::fs::read_to_string(fixture.refs.head_path()).unwrap(),
            "ref: refs/heads/master\n"
        );
    }

    #[rstest]
    fn update_head_when_detached_leaves_branches_alone(fixture: Fixture) {
        let first = codec::hash(b"first");
        let second = codec::hash(b"second");
        fixture.refs.update_head(&first).unwrap();
        fixture
            .refs
            .set_head(&HeadTarget::Detached(first.clone()))
            .unwrap();

        fixture.refs.update_head(&second).unwrap();

        assert_eq!(fixture.refs.head().unwrap(), HeadTarget::Detached(second));
        assert_eq!(fixture.refs.read_branch(&branch("master")).unwrap(), Some(first));
    }

    #[rstest]
    fn creating_an_existing_branch_fails(fixture: Fixture) {
        let oid = codec::hash(b"commit");
        fixture.refs.create_branch(&branch("topic"), &oid).unwrap();

        for name in ["topic", "topic/nested"] {
            let err = fixture.refs.create_branch(&branch(name), &oid).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ArborError>(),
                Some(ArborError::RefAlreadyExists(_))
            ));
        }
    }

    #[rstest]
    fn lists_and_deletes_nested_branches(fixture: Fixture) {
        let oid = codec::hash(b"commit");
        fixture.refs.update_head(&oid).unwrap();
        fixture.refs.create_branch(&branch("feature/login"), &oid).unwrap();
        fixture.refs.create_branch(&branch("alpha"), &oid).unwrap();

        assert_eq!(
            fixture.refs.list_branches().unwrap(),
            vec![branch("alpha"), branch("feature/login"), branch("master")]
        );

        assert_eq!(fixture.refs.delete_branch(&branch("feature/login")).unwrap(), oid);
        assert!(!fixture.refs.heads_path().join("feature").exists());
        assert_eq!(
            fixture.refs.list_branches().unwrap(),
            vec![branch("alpha"), branch("master")]
        );
    }

    #[rstest]
    fn current_branch_cannot_be_deleted(fixture: Fixture) {
        fixture.refs.update_head(&codec::hash(b"commit")).unwrap();

        let err = fixture.refs.delete_branch(&branch("master")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::DeleteCurrentBranch(_))
        ));
    }
}
