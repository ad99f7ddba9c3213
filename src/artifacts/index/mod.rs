//! Index file format
//!
//! The index (staging area) records the changes that will go into the next commit,
//! relative to the tree of the commit HEAD points at. A path is either staged with
//! new content or marked deleted; paths absent from the index are untouched.
//!
//! ## File Format (Version 1)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "ARIX" (4 bytes)
//!   - Version: 1 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, sorted by path):
//!   - State (1 byte): 0 deleted, 1 regular file, 2 executable file
//!   - Object id (20 bytes, staged states only)
//!   - Path length (2 bytes) and path bytes
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying index files
pub const SIGNATURE: &[u8; 4] = b"ARIX";

/// Index file format version
pub const VERSION: u32 = 1;
