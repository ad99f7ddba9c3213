//! Repository operations, each implemented as methods on `Repository`
//!
//! - `plumbing`: direct object access (hash-object, cat-file, ls-tree)
//! - `porcelain`: the version-control workflow (init, add, rm, commit, branch,
//!   checkout, log, status)

pub mod plumbing;
pub mod porcelain;
