//! Object types and operations
//!
//! All content is stored as immutable objects identified by the SHA-1 hash of their
//! canonical bytes. There are three object types:
//!
//! - **Blob**: File content (raw bytes, no name or mode)
//! - **Tree**: Directory listing (names, modes, and object IDs), sorted by name
//! - **Commit**: Snapshot with metadata (tree, parent commits, author, message)
//!
//! Every object serializes to `<type> <size>\0<content>`; the object id is the hash
//! of exactly these bytes.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in raw bytes
pub const OBJECT_ID_RAW_LENGTH: usize = 20;
