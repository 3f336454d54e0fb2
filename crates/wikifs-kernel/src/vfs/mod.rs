//! Virtual filesystem over wiki sites.
//!
//! - [`PathFs`] - the path-level contract a kernel bridge drives
//! - [`WikiTree`] - root, one directory per site, lazily probed documents
//! - [`NamePolicy`] - which leaf names are documents and which are writable
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: operations take slash-separated paths from
//!   the mount root. The bridge keeps its own inode table.
//! - **Whole-file contents**: a document is read and saved as one string.
//!   Offsets and partial writes are buffered by the bridge.
//! - **Fixed directories**: the root and site directories are built once;
//!   directory creation and removal are refused.

mod error;
mod names;
mod node;
mod ops;
mod path;
mod tree;

pub use error::{FsError, FsResult};
pub use names::{DEFAULT_SUFFIX, NamePolicy};
pub use node::{DirId, Node, SwapFile};
pub use ops::PathFs;
pub use path::{scan_path, split_path};
pub use tree::WikiTree;
