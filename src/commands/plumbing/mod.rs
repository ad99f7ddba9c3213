//! Low-level object access
//!
//! - `hash_object`: compute a file's blob id and optionally store it
//! - `cat_file`: load an object by id or prefix
//! - `ls_tree`: list a tree's entries

pub mod cat_file;
pub mod hash_object;
pub mod ls_tree;
