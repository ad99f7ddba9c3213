//! Content hashing and storage codec
//!
//! Object ids are SHA-1 digests of an object's canonical bytes. The codec is a
//! lossless byte transform applied after hashing, right before bytes hit the disk,
//! and undone right after they are read back.

use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Hash raw bytes into an object id.
pub fn hash(data: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(data);

    ObjectId::from_digest(hasher.finalize().as_slice())
}

/// Invertible byte transform used for stored objects.
pub trait Codec: std::fmt::Debug + Send + Sync {
    fn encode(&self, data: &[u8]) -> anyhow::Result<Bytes>;

    fn decode(&self, data: &[u8]) -> anyhow::Result<Bytes>;
}

/// zlib compression, the default storage codec
#[derive(Debug, Clone)]
pub struct ZlibCodec {
    level: flate2::Compression,
}

impl ZlibCodec {
    pub fn new(level: flate2::Compression) -> Self {
        ZlibCodec { level }
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        ZlibCodec::new(flate2::Compression::default())
    }
}

impl Codec for ZlibCodec {
    fn encode(&self, data: &[u8]) -> anyhow::Result<Bytes> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(Bytes::from)
            .context("Unable to finish compressing object content")
    }

    fn decode(&self, data: &[u8]) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }
}

/// Stores bytes as they are
#[derive(Debug, Clone, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> anyhow::Result<Bytes> {
        Ok(Bytes::copy_from_slice(data))
    }

    fn decode(&self, data: &[u8]) -> anyhow::Result<Bytes> {
        Ok(Bytes::copy_from_slice(data))
    }
}
