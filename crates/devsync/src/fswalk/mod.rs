//! Ignore-aware traversal of a local source tree.

pub mod ignore_filter;
pub mod walker;

pub use ignore_filter::{IgnoreFilter, IGNORE_FILE_NAME};
pub use walker::{is_hidden_name, relative_key, PathWalker, Walk, WalkAction, WalkEntry, WalkError};
