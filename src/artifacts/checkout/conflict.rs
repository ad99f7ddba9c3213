/// Reasons a checkout refuses to touch a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictType {
    /// The index holds changes that are not committed yet
    StagedChanges,
    /// A tracked file was modified or deleted and the target changes it
    StaleFile,
    /// An untracked file is in the way of a file the target writes
    UntrackedOverwritten,
}

impl ConflictType {
    pub fn header(&self) -> &'static str {
        match self {
            ConflictType::StagedChanges => {
                "Your staged changes to the following files would be lost by checkout:"
            }
            ConflictType::StaleFile => {
                "Your local changes to the following files would be overwritten by checkout:"
            }
            ConflictType::UntrackedOverwritten => {
                "The following untracked working tree files would be overwritten by checkout:"
            }
        }
    }

    pub fn footer(&self) -> &'static str {
        match self {
            ConflictType::StagedChanges | ConflictType::StaleFile => {
                "Please commit your changes before you switch branches."
            }
            ConflictType::UntrackedOverwritten => {
                "Please move or remove them before you switch branches."
            }
        }
    }
}
