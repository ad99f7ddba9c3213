use crate::areas::refs::HEAD_REF_NAME;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::ArborError;
use anyhow::Context;

/// Shortest abbreviated object id accepted as a revision
pub const MIN_PREFIX_LENGTH: usize = 4;

/// A revision expression naming a commit.
///
/// Supported forms:
/// - `HEAD`
/// - branch names: `master`, `feature/login`
/// - full object ids and unique abbreviated ids of at least four hex chars
/// - `<revision>^` (first parent) and `<revision>~<n>` (n-th first-parent ancestor)
///
/// A name that is both a branch and a valid hex prefix resolves to the branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Ref(String),
    Parent(Box<Revision>),
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else if revision == HEAD_REF_NAME || Self::looks_like_oid(revision) {
            Ok(Revision::Ref(revision.to_string()))
        } else {
            let branch_name = BranchName::try_parse(revision.to_string())?;
            Ok(Revision::Ref(branch_name.to_string()))
        }
    }

    /// Resolve to the id of a commit
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        match self {
            Revision::Ref(name) => Self::resolve_ref(name, repository),
            Revision::Parent(base_revision) => {
                let oid = base_revision.resolve(repository)?;
                self.first_parent(&oid, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = self.first_parent(&oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_ref(name: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if name == HEAD_REF_NAME {
            return repository
                .refs()
                .read_head()?
                .ok_or_else(|| ArborError::UnknownRef(name.to_string()).into());
        }

        if let Ok(branch_name) = BranchName::try_parse(name.to_string()) {
            if let Some(oid) = repository.refs().read_branch(&branch_name)? {
                return Ok(oid);
            }
        }

        if Self::looks_like_oid(name) {
            Self::resolve_oid(name, repository)
        } else {
            Err(ArborError::UnknownRef(name.to_string()).into())
        }
    }

    fn first_parent(&self, oid: &ObjectId, repository: &Repository) -> anyhow::Result<ObjectId> {
        let commit = repository.database().parse_object_as_commit(oid)?;

        commit
            .parent()
            .cloned()
            .ok_or_else(|| ArborError::UnknownRef(self.to_string()).into())
    }

    fn resolve_oid(prefix: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        let database = repository.database();

        if prefix.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(prefix.to_string())?;
            if !database.exists(&oid) {
                return Err(ArborError::UnknownRef(prefix.to_string()).into());
            }
            Self::validate_oid_is_commit(&oid, repository)?;

            return Ok(oid);
        }

        let matches = database.find_objects_by_prefix(prefix)?;
        match matches.as_slice() {
            [] => Err(ArborError::UnknownRef(prefix.to_string()).into()),
            [oid] => {
                Self::validate_oid_is_commit(oid, repository)?;
                Ok(oid.clone())
            }
            _ => {
                let mut commit_matches = Vec::new();
                for oid in matches {
                    if database.object_type(&oid)? == ObjectType::Commit {
                        commit_matches.push(oid);
                    }
                }

                match commit_matches.len() {
                    0 => Err(ArborError::UnknownRef(prefix.to_string()).into()),
                    1 => Ok(commit_matches.remove(0)),
                    _ => Err(ArborError::AmbiguousObjectId {
                        prefix: prefix.to_string(),
                        candidates: commit_matches,
                    }
                    .into()),
                }
            }
        }
    }

    fn validate_oid_is_commit(oid: &ObjectId, repository: &Repository) -> anyhow::Result<()> {
        let object_type = repository.database().object_type(oid)?;

        if object_type != ObjectType::Commit {
            return Err(ArborError::UnexpectedObjectType {
                oid: oid.clone(),
                expected: ObjectType::Commit,
                actual: object_type,
            }
            .into());
        }

        Ok(())
    }

    fn looks_like_oid(s: &str) -> bool {
        s.len() >= MIN_PREFIX_LENGTH
            && s.len() <= OBJECT_ID_LENGTH
            && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::Ref(name) => write!(f, "{name}"),
            Revision::Parent(base) => write!(f, "{base}^"),
            Revision::Ancestor(base, generations) => write!(f, "{base}~{generations}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn reference(name: &str) -> Box<Revision> {
        Box::new(Revision::Ref(name.to_string()))
    }

    #[rstest]
    #[case("main", Revision::Ref("main".to_string()))]
    #[case("HEAD", Revision::Ref("HEAD".to_string()))]
    #[case("abcd12", Revision::Ref("abcd12".to_string()))]
    #[case("main^", Revision::Parent(reference("main")))]
    #[case("HEAD~3", Revision::Ancestor(reference("HEAD"), 3))]
    #[case("main^^", Revision::Parent(Box::new(Revision::Parent(reference("main")))))]
    fn parses_revision_expressions(#[case] input: &str, #[case] expected: Revision) {
        let revision = Revision::try_parse(input).unwrap();

        assert_eq!(revision, expected);
        assert_eq!(revision.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("invalid name")]
    #[case("invalid:name")]
    #[case(".invalid")]
    #[case("branch.lock")]
    fn rejects_invalid_names(#[case] input: &str) {
        assert!(Revision::try_parse(input).is_err());
    }
}
