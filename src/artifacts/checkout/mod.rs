//! Checkout planning and conflict handling
//!
//! Switching to another commit compares three states of every path: the tree HEAD
//! points at, the target tree and the working tree. The resulting plan lists files to
//! delete and files to write; conflicts are collected while planning, so checkout is
//! refused before anything on disk changes.

pub mod conflict;
pub mod migration;
