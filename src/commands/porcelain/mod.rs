//! User-facing operations
//!
//! - `init`: create the metadata directory
//! - `add` / `rm`: stage content and deletions
//! - `commit`: turn the staged changes into a commit
//! - `branch`: create, delete and list branches
//! - `checkout`: switch the working tree to a branch or commit
//! - `log`: first-parent history
//! - `status`: compare HEAD, index and working tree

pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod init;
pub mod log;
pub mod rm;
pub mod status;
