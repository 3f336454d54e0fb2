//! Path-level filesystem contract.
//!
//! This is what a kernel bridge calls: every operation takes a
//! slash-separated path from the mount root, and file contents are whole
//! strings. Offsets, handles and inodes are the bridge's business.

use async_trait::async_trait;

use super::FsResult;

/// Operations a mounted wiki tree answers.
///
/// The `can_*` checks never fail; a path that cannot be resolved simply
/// answers `false`.
#[async_trait]
pub trait PathFs: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Whether `path` names a directory. Never touches the network.
    async fn is_directory(&self, path: &str) -> bool;

    /// Visible entry names of a directory, sorted. `.` and `..` are omitted.
    async fn list(&self, path: &str) -> FsResult<Vec<String>>;

    /// Whether `path` names a file.
    ///
    /// A document name with no entry yet is probed remotely and installed
    /// when the wiki has content for it.
    async fn is_file(&self, path: &str) -> bool;

    /// [`PathFs::is_file`] that reports a failed remote probe instead of
    /// answering `false`. A missing path is still `Ok(false)`.
    async fn probe_file(&self, path: &str) -> FsResult<bool> {
        Ok(self.is_file(path).await)
    }

    /// Whole contents of a file.
    async fn read(&self, path: &str) -> FsResult<String>;

    /// Length in bytes of [`PathFs::read`].
    async fn size(&self, path: &str) -> FsResult<u64> {
        Ok(self.read(path).await?.len() as u64)
    }

    // ========================================================================
    // Writing
    // ========================================================================

    async fn can_write(&self, path: &str) -> bool;

    /// Replace the contents of a file, creating it if needed.
    ///
    /// Content that is blank after trimming leaves the previous body alone.
    async fn write(&self, path: &str, content: &str) -> FsResult<()>;

    async fn can_delete(&self, _path: &str) -> bool {
        true
    }

    /// Detach an entry from the tree. Nothing is deleted remotely.
    async fn delete(&self, path: &str) -> FsResult<()>;

    // ========================================================================
    // Directories (unsupported)
    // ========================================================================

    async fn can_mkdir(&self, _path: &str) -> bool {
        false
    }

    async fn mkdir(&self, _path: &str) -> FsResult<()> {
        Ok(())
    }

    async fn can_rmdir(&self, _path: &str) -> bool {
        false
    }

    async fn rmdir(&self, _path: &str) -> FsResult<()> {
        Ok(())
    }
}
