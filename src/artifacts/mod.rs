//! Repository data structures and algorithms
//!
//! - `branch`: Branch names and revision parsing
//! - `checkout`: Checkout planning and working-tree conflict detection
//! - `codec`: Content hashing and the pluggable storage codec
//! - `database`: Tree entry type shared by trees and snapshots
//! - `index`: Index file format (header, entries, checksum)
//! - `log`: First-parent commit history traversal
//! - `objects`: Object types (blob, tree, commit)
//! - `snapshot`: Building trees from the index and flattening trees into path maps
//! - `status`: Working tree status report

pub mod branch;
pub mod checkout;
pub mod codec;
pub mod database;
pub mod index;
pub mod log;
pub mod objects;
pub mod snapshot;
pub mod status;
