use crate::areas::refs::HeadTarget;
use crate::areas::repository::Repository;
use crate::artifacts::branch::DEFAULT_BRANCH;
use crate::artifacts::branch::branch_name::BranchName;
use crate::errors::ArborError;
use anyhow::Context;
use std::fs;
use tracing::info;

impl Repository {
    /// Create the metadata directory with an empty object store and HEAD attached to
    /// the default branch, which has no commits yet.
    pub fn init(&self) -> anyhow::Result<()> {
        let metadata_path = self.metadata_path();
        if metadata_path.exists() {
            return Err(ArborError::RepositoryAlreadyExists(metadata_path).into());
        }

        fs::create_dir_all(self.database().objects_path())
            .context("Failed to create objects directory")?;
        fs::create_dir_all(self.refs().heads_path())
            .context("Failed to create refs/heads directory")?;

        let default_branch = BranchName::try_parse(DEFAULT_BRANCH.to_string())?;
        self.refs()
            .set_head(&HeadTarget::Branch(default_branch))
            .context("Failed to create initial HEAD reference")?;
        info!(path = %self.path().display(), "initialized repository");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_attaches_head_to_an_unborn_default_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(dir.path()).unwrap();

        repository.init().unwrap();

        assert_eq!(
            repository.refs().current_branch().unwrap().unwrap().as_ref(),
            DEFAULT_BRANCH
        );
        assert_eq!(repository.refs().read_head().unwrap(), None);
        assert!(repository.database().objects_path().is_dir());
    }

    #[test]
    fn init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Repository::new(dir.path()).unwrap();
        repository.init().unwrap();

        let err = repository.init().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::RepositoryAlreadyExists(_))
        ));
    }
}
