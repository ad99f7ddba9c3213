use crate::errors::ArborError;

#[derive(Debug, Clone, Copy, Eq, Ord, Hash, Default, PartialEq, PartialOrd)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

impl FileMode {
    pub fn from_executable(executable: bool) -> Self {
        if executable {
            FileMode::Executable
        } else {
            FileMode::Regular
        }
    }

    pub fn is_executable(&self) -> bool {
        *self == FileMode::Executable
    }
}

#[derive(Debug, Clone, Copy, Eq, Ord, Hash, PartialEq, PartialOrd)]
pub enum EntryMode {
    File(FileMode),
    Directory,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::Directory => "040000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, EntryMode::File(FileMode::Executable))
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = ArborError;

    fn try_from(mode: u32) -> Result<Self, ArborError> {
        match mode {
            0o100644 => Ok(EntryMode::File(FileMode::Regular)),
            0o100755 => Ok(EntryMode::File(FileMode::Executable)),
            0o40000 => Ok(EntryMode::Directory),
            other => Err(ArborError::malformed(
                "tree",
                format!("invalid entry mode {other:o}"),
            )),
        }
    }
}

impl From<FileMode> for EntryMode {
    fn from(mode: FileMode) -> Self {
        EntryMode::File(mode)
    }
}

impl TryFrom<EntryMode> for FileMode {
    type Error = anyhow::Error;

    fn try_from(value: EntryMode) -> anyhow::Result<Self> {
        match value {
            EntryMode::File(mode) => Ok(mode),
            EntryMode::Directory => Err(anyhow::anyhow!("a directory has no file mode")),
        }
    }
}
