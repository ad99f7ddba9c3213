use crate::areas::refs::HEAD_REF_NAME;
use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use crate::errors::ArborError;
use anyhow::Context;

/// Validated name of a branch under `refs/heads/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() || name == HEAD_REF_NAME {
            return Err(ArborError::InvalidBranchName(name).into());
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .with_context(|| format!("invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"))?;

        if re.is_match(&name) {
            Err(ArborError::InvalidBranchName(name).into())
        } else {
            Ok(Self(name))
        }
    }

    /// Path of the ref relative to the metadata directory
    pub fn to_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
