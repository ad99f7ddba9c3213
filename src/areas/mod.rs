//! Stateful repository areas
//!
//! - `database`: content-addressed object store
//! - `index`: staging area of pending changes
//! - `refs`: branches and HEAD
//! - `workspace`: working tree files
//! - `lock`: cross-process repository lock
//! - `repository`: the context tying the areas together

mod atomic;
pub mod database;
pub mod index;
pub mod lock;
pub mod refs;
pub mod repository;
pub mod workspace;
