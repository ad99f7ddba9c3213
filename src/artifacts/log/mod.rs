//! Commit history traversal
//!
//! History is walked along first parents only, so a merge commit shows up once and
//! the branches it merged in are not visited.

pub mod rev_list;
