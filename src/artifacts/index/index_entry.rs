//! Index entry representation
//!
//! Each entry records one path and what the next commit should do with it: take the
//! staged blob (with its executable flag) or drop the path entirely.

use crate::artifacts::index::entry_mode::FileMode;
use crate::artifacts::objects::OBJECT_ID_RAW_LENGTH;
use crate::artifacts::objects::object::Packable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::ArborError;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Maximum path length supported in index entries
const MAX_PATH_SIZE: usize = u16::MAX as usize;

const STATE_DELETED: u8 = 0;
const STATE_REGULAR: u8 = 1;
const STATE_EXECUTABLE: u8 = 2;

/// Pending change for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Commit this blob at the path
    Staged { oid: ObjectId, mode: FileMode },
    /// Tombstone: omit the path from the next tree
    Deleted,
}

impl EntryState {
    pub fn oid(&self) -> Option<&ObjectId> {
        match self {
            EntryState::Staged { oid, .. } => Some(oid),
            EntryState::Deleted => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, EntryState::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexEntry {
    /// File path relative to repository root, `/`-separated
    pub name: PathBuf,
    pub state: EntryState,
}

impl IndexEntry {
    /// Every proper ancestor directory of the entry, outermost first
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .name
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();

        dirs
    }

    pub fn read_from(reader: &mut impl Read) -> anyhow::Result<Self> {
        let truncated = || ArborError::CorruptIndex("truncated entry".to_string());

        let state = reader.read_u8().map_err(|_| truncated())?;
        let state = match state {
            STATE_DELETED => EntryState::Deleted,
            STATE_REGULAR | STATE_EXECUTABLE => {
                let mut oid_bytes = [0u8; OBJECT_ID_RAW_LENGTH];
                reader.read_exact(&mut oid_bytes).map_err(|_| truncated())?;

                EntryState::Staged {
                    oid: ObjectId::read_raw_from(&mut oid_bytes.as_slice())?,
                    mode: FileMode::from_executable(state == STATE_EXECUTABLE),
                }
            }
            other => {
                return Err(ArborError::CorruptIndex(format!("unknown entry state {other}")).into());
            }
        };

        let name_len = reader.read_u16::<NetworkEndian>().map_err(|_| truncated())?;
        let mut name_bytes = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_bytes).map_err(|_| truncated())?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| ArborError::CorruptIndex("entry path is not UTF-8".to_string()))?;

        Ok(IndexEntry {
            name: PathBuf::from(name),
            state,
        })
    }
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let entry_name = self
            .name
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid entry name {:?}", self.name))?;
        if entry_name.len() > MAX_PATH_SIZE {
            anyhow::bail!("Entry name too long: {}", entry_name);
        }

        let mut entry_bytes = Vec::new();
        match &self.state {
            EntryState::Deleted => entry_bytes.write_u8(STATE_DELETED)?,
            EntryState::Staged { oid, mode } => {
                let state = if mode.is_executable() {
                    STATE_EXECUTABLE
                } else {
                    STATE_REGULAR
                };
                entry_bytes.write_u8(state)?;
                oid.write_raw_to(&mut entry_bytes)?;
            }
        }
        entry_bytes.write_u16::<NetworkEndian>(entry_name.len() as u16)?;
        entry_bytes.write_all(entry_name.as_bytes())?;

        Ok(Bytes::from(entry_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::codec;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn oid() -> ObjectId {
        codec::hash(b"test data")
    }

    #[rstest]
    fn test_entry_parent_dirs(oid: ObjectId) {
        let entry = IndexEntry::new(
            PathBuf::from("a/b/c"),
            EntryState::Staged {
                oid,
                mode: FileMode::Regular,
            },
        );

        assert_eq!(entry.parent_dirs(), vec![Path::new("a"), Path::new("a/b")]);
    }

    #[test]
    fn test_entry_parent_dirs_root() {
        let entry = IndexEntry::new(PathBuf::from("a"), EntryState::Deleted);

        assert_eq!(entry.parent_dirs(), Vec::<&Path>::new());
    }

    #[rstest]
    #[case(EntryState::Deleted)]
    #[case(EntryState::Staged { oid: codec::hash(b"x"), mode: FileMode::Executable })]
    fn entry_reads_back_with_its_state(#[case] state: EntryState) {
        let entry = IndexEntry::new(PathBuf::from("dir/file name.txt"), state);
        let bytes = entry.serialize().unwrap();

        let parsed = IndexEntry::read_from(&mut bytes.as_ref()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn unknown_state_byte_is_corrupt() {
        let bytes = [9u8, 0, 1, b'a'];
        let err = IndexEntry::read_from(&mut bytes.as_slice()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ArborError>(),
            Some(ArborError::CorruptIndex(_))
        ));
    }
}
