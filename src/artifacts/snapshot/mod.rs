//! Conversions between flat path maps and stored tree hierarchies
//!
//! - `builder`: folds staged path changes into a new tree, bottom-up
//! - `flatten`: walks a stored tree into a path-keyed map

pub mod builder;
pub mod flatten;
