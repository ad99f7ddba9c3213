use crate::artifacts::index::{SIGNATURE, VERSION};
use crate::artifacts::objects::object::Packable;
use crate::errors::ArborError;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::{Read, Write};

#[derive(Debug, Clone, new)]
pub struct IndexHeader {
    pub(crate) entries_count: u32,
}

impl IndexHeader {
    /// Read and validate a header, rejecting foreign signatures and versions.
    pub fn read_from(reader: &mut impl Read) -> anyhow::Result<Self> {
        let mut marker = [0u8; 4];
        reader
            .read_exact(&mut marker)
            .map_err(|_| ArborError::CorruptIndex("truncated header".to_string()))?;
        if &marker != SIGNATURE {
            return Err(ArborError::CorruptIndex("invalid signature".to_string()).into());
        }

        let version = reader
            .read_u32::<NetworkEndian>()
            .map_err(|_| ArborError::CorruptIndex("truncated header".to_string()))?;
        if version != VERSION {
            return Err(
                ArborError::CorruptIndex(format!("unsupported version {version}")).into(),
            );
        }

        let entries_count = reader
            .read_u32::<NetworkEndian>()
            .map_err(|_| ArborError::CorruptIndex("truncated header".to_string()))?;

        Ok(IndexHeader { entries_count })
    }
}

impl Packable for IndexHeader {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut bytes = Vec::new();
        bytes.write_all(SIGNATURE)?;
        bytes.write_u32::<NetworkEndian>(VERSION)?;
        bytes.write_u32::<NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(bytes))
    }
}
