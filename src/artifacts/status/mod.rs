//! Working tree status
//!
//! - `file_change`: per-path change codes and labels
//! - `status_info`: the three-way comparison of HEAD, index and working tree

pub mod file_change;
pub mod status_info;
