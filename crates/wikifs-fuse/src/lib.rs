//! FUSE front end for the wiki tree.
//!
//! [`bridge::Bridge`] turns inode-and-handle calls into whole-document
//! [`PathFs`](wikifs_kernel::PathFs) operations; [`filesystem`] hands it to
//! `fuser`. [`bootstrap`] sets up logging and logs in to the configured sites.

pub mod bootstrap;
pub mod bridge;
pub mod errno;
pub mod filesystem;
mod handle;
mod inode;

pub use bootstrap::{build_tree, build_tree_with, init_tracing};
pub use bridge::{Bridge, Entry, EntryKind};
pub use filesystem::{MountConfig, WikiFuse, mount};
pub use inode::ROOT_INODE;
