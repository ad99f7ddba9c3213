use colored::{ColoredString, Colorize};

const LABEL_INDENT: usize = 8;

/// How the index differs from HEAD for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IndexChange {
    #[default]
    None,
    Added,
    Modified,
    Deleted,
}

impl IndexChange {
    pub fn code(&self) -> char {
        match self {
            IndexChange::None => ' ',
            IndexChange::Added => 'A',
            IndexChange::Modified => 'M',
            IndexChange::Deleted => 'D',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            IndexChange::None => "",
            IndexChange::Added => "new file:   ",
            IndexChange::Modified => "modified:   ",
            IndexChange::Deleted => "deleted:    ",
        }
    }
}

/// How the working tree differs from what would be committed for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WorkspaceChange {
    #[default]
    None,
    Modified,
    Deleted,
}

impl WorkspaceChange {
    pub fn code(&self) -> char {
        match self {
            WorkspaceChange::None => ' ',
            WorkspaceChange::Modified => 'M',
            WorkspaceChange::Deleted => 'D',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            WorkspaceChange::None => "",
            WorkspaceChange::Modified => "modified:   ",
            WorkspaceChange::Deleted => "deleted:    ",
        }
    }
}

/// Both sides of a tracked path's change, rendered as a porcelain `XY` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileChange {
    pub index: IndexChange,
    pub workspace: WorkspaceChange,
}

impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.index.code(), self.workspace.code())
    }
}

/// Indented, colored label used by the long status format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLabel {
    Staged(IndexChange),
    Unstaged(WorkspaceChange),
}

impl std::fmt::Display for ChangeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label: ColoredString = match self {
            ChangeLabel::Staged(change) => change.label().green(),
            ChangeLabel::Unstaged(change) => change.label().red(),
        };
        write!(f, "{:>width$}{}", "", label, width = LABEL_INDENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IndexChange::Added, WorkspaceChange::None, "A ")]
    #[case(IndexChange::Modified, WorkspaceChange::Modified, "MM")]
    #[case(IndexChange::None, WorkspaceChange::Deleted, " D")]
    #[case(IndexChange::Deleted, WorkspaceChange::None, "D ")]
    fn porcelain_codes(
        #[case] index: IndexChange,
        #[case] workspace: WorkspaceChange,
        #[case] expected: &str,
    ) {
        assert_eq!(FileChange { index, workspace }.to_string(), expected);
    }
}
