//! Tree object
//!
//! Trees are directory snapshots: each entry names a child blob or tree together with
//! its mode (regular file, executable file or directory).
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`, entries sorted by name bytes. Each entry is:
//!
//! ```text
//! mode        u32 big-endian (0o100644, 0o100755 or 0o40000)
//! name length u32 big-endian
//! name        raw UTF-8 bytes
//! object id   20 raw bytes
//! ```
//!
//! Names are length-prefixed rather than terminated, so no byte inside a name can be
//! confused with a delimiter. Sorting makes the encoding a pure function of the
//! entries: independently built directories with the same content share one id.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::OBJECT_ID_RAW_LENGTH;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::ArborError;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};

/// Tree object representing a directory snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, DatabaseEntry>,
}

/// Reject names that cannot be a single path component.
pub fn validate_entry_name(name: &str) -> Result<(), ArborError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\0');

    if invalid {
        Err(ArborError::malformed(
            "tree",
            format!("invalid entry name {name:?}"),
        ))
    } else {
        Ok(())
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry called `name`.
    pub fn insert(&mut self, name: impl Into<String>, entry: DatabaseEntry) -> anyhow::Result<()> {
        let name = name.into();
        validate_entry_name(&name)?;
        self.entries.insert(name, entry);

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.entries.into_iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();

        for (name, entry) in &self.entries {
            content_bytes.write_u32::<NetworkEndian>(entry.mode.as_u32())?;
            content_bytes.write_u32::<NetworkEndian>(name.len() as u32)?;
            content_bytes.write_all(name.as_bytes())?;
            entry.oid.write_raw_to(&mut content_bytes)?;
        }

        frame(self.object_type(), &content_bytes)
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut previous_name: Option<String> = None;

        // clean EOF between entries ends the tree
        while !reader.fill_buf()?.is_empty() {
            let mode = reader
                .read_u32::<NetworkEndian>()
                .map_err(|_| ArborError::malformed("tree", "unexpected EOF in mode"))?;
            let mode = EntryMode::try_from(mode)?;

            let name_len = reader
                .read_u32::<NetworkEndian>()
                .map_err(|_| ArborError::malformed("tree", "unexpected EOF in name length"))?;
            // the length is untrusted: read what is there instead of allocating it up front
            let mut name_bytes = Vec::new();
            (&mut reader)
                .take(u64::from(name_len))
                .read_to_end(&mut name_bytes)?;
            if name_bytes.len() != name_len as usize {
                return Err(ArborError::malformed("tree", "unexpected EOF in name").into());
            }
            let name = String::from_utf8(name_bytes)
                .map_err(|_| ArborError::malformed("tree", "entry name is not UTF-8"))?;
            validate_entry_name(&name)?;

            let mut oid_bytes = [0u8; OBJECT_ID_RAW_LENGTH];
            reader
                .read_exact(&mut oid_bytes)
                .map_err(|_| ArborError::malformed("tree", "unexpected EOF in object id"))?;
            let oid = ObjectId::read_raw_from(&mut oid_bytes.as_slice())?;

            if previous_name.as_ref().is_some_and(|previous| *previous >= name) {
                return Err(ArborError::malformed(
                    "tree",
                    format!("entry {name:?} is out of order or duplicated"),
                )
                .into());
            }
            previous_name = Some(name.clone());

            entries.insert(name, DatabaseEntry::new(oid, mode));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let object_type = if entry.is_tree() {
                    ObjectType::Tree
                } else {
                    ObjectType::Blob
                };

                format!(
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    object_type,
                    entry.oid,
                    name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}
