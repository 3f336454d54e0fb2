//! Inode-level operations over a path-level tree.
//!
//! [`Bridge`] is what the FUSE callbacks call into. It owns the inode and
//! handle tables and turns offset reads and writes into whole-document
//! reads and saves. Async tree calls are driven to completion on the given
//! runtime, so bridge methods must not be called from inside it.

use std::sync::Arc;
use tokio::runtime::Handle;

use wikifs_kernel::vfs::split_path;
use wikifs_kernel::{FsError, PathFs};

use crate::errno::{Errno, errno};
use crate::handle::{HandleTable, MAX_FILE_SIZE, OpenFile};
use crate::inode::{InodeTable, child_path};

/// Kind of a resolved entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// What `lookup`/`getattr` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub ino: u64,
    pub kind: EntryKind,
    pub size: u64,
}

pub type BridgeResult<T> = Result<T, Errno>;

fn fs_err(e: FsError) -> Errno {
    tracing::debug!("tree error: {}", e);
    errno(&e)
}

pub struct Bridge<F> {
    fs: Arc<F>,
    runtime: Handle,
    inodes: InodeTable,
    handles: HandleTable,
}

impl<F: PathFs> Bridge<F> {
    pub fn new(fs: Arc<F>, runtime: Handle) -> Self {
        Self {
            fs,
            runtime,
            inodes: InodeTable::new(),
            handles: HandleTable::new(),
        }
    }

    fn path_of(&self, ino: u64) -> BridgeResult<String> {
        self.inodes
            .path_for(ino)
            .map(|entry| entry.path.clone())
            .ok_or(libc::ENOENT)
    }

    fn child_of(&self, parent: u64, name: &str) -> BridgeResult<String> {
        Ok(child_path(&self.path_of(parent)?, name))
    }

    /// Resolve `path` in the tree and register its inode.
    fn stat(&mut self, path: &str) -> BridgeResult<Entry> {
        let fs = self.fs.clone();
        // A failed probe is EIO, never ENOENT: editors would offer to
        // create the document over the existing one.
        let (is_dir, is_file) = self
            .runtime
            .block_on(async {
                if fs.is_directory(path).await {
                    Ok((true, false))
                } else {
                    fs.probe_file(path).await.map(|is_file| (false, is_file))
                }
            })
            .map_err(fs_err)?;

        if is_dir {
            let ino = self.inodes.insert(path, true);
            return Ok(Entry {
                ino,
                kind: EntryKind::Directory,
                size: 0,
            });
        }
        if !is_file {
            return Err(libc::ENOENT);
        }

        let size = match self.handles.unsaved_len(path) {
            Some(len) => len,
            None => self
                .runtime
                .block_on(fs.size(path))
                .map_err(fs_err)?,
        };
        let ino = self.inodes.insert(path, false);
        Ok(Entry {
            ino,
            kind: EntryKind::File,
            size,
        })
    }

    pub fn lookup(&mut self, parent: u64, name: &str) -> BridgeResult<Entry> {
        let path = self.child_of(parent, name)?;
        self.stat(&path)
    }

    pub fn getattr(&mut self, ino: u64) -> BridgeResult<Entry> {
        let path = self.path_of(ino)?;
        self.stat(&path)
    }

    /// Entries of a directory, `.` and `..` first.
    pub fn readdir(&mut self, ino: u64) -> BridgeResult<Vec<(u64, EntryKind, String)>> {
        let path = self.path_of(ino)?;
        let fs = self.fs.clone();
        let names = self.runtime.block_on(fs.list(&path)).map_err(fs_err)?;

        let (parent, _) = split_path(&path);
        let parent_ino = self.inodes.insert(&parent, true);
        let mut listing = vec![
            (ino, EntryKind::Directory, ".".to_string()),
            (parent_ino, EntryKind::Directory, "..".to_string()),
        ];
        for name in names {
            let child = child_path(&path, &name);
            let is_dir = self.runtime.block_on(fs.is_directory(&child));
            let kind = if is_dir {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            listing.push((self.inodes.insert(&child, is_dir), kind, name));
        }
        Ok(listing)
    }

    /// Open a file, loading its current contents unless truncating.
    pub fn open(&mut self, ino: u64, flags: i32) -> BridgeResult<u64> {
        let path = self.path_of(ino)?;
        let fs = self.fs.clone();
        let writing = flags & libc::O_ACCMODE != libc::O_RDONLY;
        if writing && !self.runtime.block_on(fs.can_write(&path)) {
            return Err(libc::EACCES);
        }

        let data = if writing && flags & libc::O_TRUNC != 0 {
            Vec::new()
        } else {
            self.runtime
                .block_on(fs.read(&path))
                .map_err(fs_err)?
                .into_bytes()
        };
        let mut file = OpenFile::new(path, data);
        if writing && flags & libc::O_TRUNC != 0 {
            file.mark_dirty();
        }
        Ok(self.handles.insert(file))
    }

    /// Create a file and open it. Nothing is saved until the handle is.
    pub fn create(&mut self, parent: u64, name: &str) -> BridgeResult<(Entry, u64)> {
        let path = self.child_of(parent, name)?;
        let fs = self.fs.clone();
        if !self.runtime.block_on(fs.can_write(&path)) {
            return Err(libc::EACCES);
        }

        let mut file = OpenFile::new(path.clone(), Vec::new());
        file.mark_dirty();
        let fh = self.handles.insert(file);
        let ino = self.inodes.insert(&path, false);
        Ok((
            Entry {
                ino,
                kind: EntryKind::File,
                size: 0,
            },
            fh,
        ))
    }

    pub fn read(&self, fh: u64, offset: i64, size: u32) -> BridgeResult<Vec<u8>> {
        let file = self.handles.get(fh).ok_or(libc::EBADF)?;
        let offset = u64::try_from(offset).map_err(|_| libc::EINVAL)?;
        Ok(file.read_at(offset, size).to_vec())
    }

    pub fn write(&mut self, fh: u64, offset: i64, data: &[u8]) -> BridgeResult<u32> {
        let file = self.handles.get_mut(fh).ok_or(libc::EBADF)?;
        let offset = u64::try_from(offset).map_err(|_| libc::EINVAL)?;
        let written = file.write_at(offset, data).ok_or(libc::EFBIG)?;
        u32::try_from(written).map_err(|_| libc::EFBIG)
    }

    /// Resize a file: its open buffers, or the saved document when none is open.
    pub fn truncate(&mut self, ino: u64, fh: Option<u64>, size: u64) -> BridgeResult<Entry> {
        let path = self.path_of(ino)?;
        if size > MAX_FILE_SIZE {
            return Err(libc::EFBIG);
        }
        if let Some(file) = fh.and_then(|fh| self.handles.get_mut(fh)) {
            file.truncate(size).ok_or(libc::EFBIG)?;
        } else {
            let mut touched = false;
            for file in self.handles.for_path_mut(&path) {
                file.truncate(size).ok_or(libc::EFBIG)?;
                touched = true;
            }
            if !touched {
                let fs = self.fs.clone();
                self.runtime
                    .block_on(async {
                        if !fs.can_write(&path).await {
                            return Err(FsError::permission_denied(&path));
                        }
                        let mut bytes = fs.read(&path).await?.into_bytes();
                        bytes.resize(size as usize, 0);
                        fs.write(&path, &String::from_utf8_lossy(&bytes)).await
                    })
                    .map_err(fs_err)?;
            }
        }
        self.getattr(ino)
    }

    /// Save a handle's buffer if it changed.
    pub fn flush(&mut self, fh: u64) -> BridgeResult<()> {
        let file = self.handles.get_mut(fh).ok_or(libc::EBADF)?;
        let Some(contents) = file.take_unsaved() else {
            return Ok(());
        };
        let path = file.path.clone();
        tracing::debug!("Saving {} ({} bytes)", path, contents.len());
        let fs = self.fs.clone();
        self.runtime
            .block_on(fs.write(&path, &contents))
            .map_err(fs_err)
    }

    pub fn release(&mut self, fh: u64) -> BridgeResult<()> {
        let result = self.flush(fh);
        self.handles.remove(fh);
        result
    }

    pub fn unlink(&mut self, parent: u64, name: &str) -> BridgeResult<()> {
        let path = self.child_of(parent, name)?;
        let fs = self.fs.clone();
        self.runtime
            .block_on(async {
                if fs.is_directory(&path).await {
                    return Err(FsError::is_a_directory(&path));
                }
                if !fs.can_delete(&path).await {
                    return Err(FsError::permission_denied(&path));
                }
                fs.delete(&path).await
            })
            .map_err(fs_err)?;
        self.inodes.remove(&path);
        Ok(())
    }

    pub fn mkdir(&mut self, parent: u64, name: &str) -> BridgeResult<Entry> {
        let path = self.child_of(parent, name)?;
        let fs = self.fs.clone();
        if !self.runtime.block_on(fs.can_mkdir(&path)) {
            return Err(libc::EACCES);
        }
        self.runtime.block_on(fs.mkdir(&path)).map_err(fs_err)?;
        self.stat(&path)
    }

    pub fn rmdir(&mut self, parent: u64, name: &str) -> BridgeResult<()> {
        let path = self.child_of(parent, name)?;
        let fs = self.fs.clone();
        if !self.runtime.block_on(fs.can_rmdir(&path)) {
            return Err(libc::EACCES);
        }
        self.runtime.block_on(fs.rmdir(&path)).map_err(fs_err)?;
        self.inodes.remove(&path);
        Ok(())
    }

    /// Move a file: read the source, write the destination, drop the source.
    pub fn rename(
        &mut self,
        parent: u64,
        name: &str,
        new_parent: u64,
        new_name: &str,
    ) -> BridgeResult<()> {
        let from = self.child_of(parent, name)?;
        let to = self.child_of(new_parent, new_name)?;
        if from == to {
            return Ok(());
        }

        let fs = self.fs.clone();
        self.runtime
            .block_on(async {
                if fs.is_directory(&from).await {
                    return Err(FsError::permission_denied(&from));
                }
                if !fs.can_write(&to).await {
                    return Err(FsError::permission_denied(&to));
                }
                let contents = fs.read(&from).await?;
                fs.write(&to, &contents).await?;
                fs.delete(&from).await
            })
            .map_err(fs_err)?;

        self.inodes.rename(&from, &to);
        self.handles.rename(&from, &to);
        Ok(())
    }
}
