//! `fuser` adapter over [`Bridge`].

use anyhow::{Context, Result};
use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;

use wikifs_kernel::PathFs;

use crate::bridge::{Bridge, Entry, EntryKind};

/// How long the kernel may cache attributes and lookups.
const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u32 = 512;

/// Mount options shared by every wikifs mount.
pub struct MountConfig {
    pub allow_other: bool,
}

pub struct WikiFuse<F> {
    bridge: Bridge<F>,
    uid: u32,
    gid: u32,
}

impl<F: PathFs> WikiFuse<F> {
    pub fn new(fs: Arc<F>, runtime: Handle) -> Self {
        Self {
            bridge: Bridge::new(fs, runtime),
            uid: rustix::process::getuid().as_raw(),
            gid: rustix::process::getgid().as_raw(),
        }
    }

    fn attr_for(&self, entry: Entry) -> FileAttr {
        let now = SystemTime::now();
        let (kind, perm) = match entry.kind {
            EntryKind::Directory => (FileType::Directory, 0o755),
            EntryKind::File => (FileType::RegularFile, 0o644),
        };
        FileAttr {
            ino: entry.ino,
            size: entry.size,
            blocks: entry.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind,
            perm,
            nlink: if entry.kind == EntryKind::Directory { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            flags: 0,
            blksize: BLOCK_SIZE,
        }
    }
}

fn file_type(kind: EntryKind) -> FileType {
    match kind {
        EntryKind::Directory => FileType::Directory,
        EntryKind::File => FileType::RegularFile,
    }
}

impl<F: PathFs> Filesystem for WikiFuse<F> {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.bridge.lookup(parent, &name.to_string_lossy()) {
            Ok(entry) => reply.entry(&TTL, &self.attr_for(entry), 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.bridge.getattr(ino) {
            Ok(entry) => reply.attr(&TTL, &self.attr_for(entry)),
            Err(errno) => reply.error(errno),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Only size changes mean anything; mode and times are accepted and ignored.
        let result = match size {
            Some(size) => self.bridge.truncate(ino, fh, size),
            None => self.bridge.getattr(ino),
        };
        match result {
            Ok(entry) => reply.attr(&TTL, &self.attr_for(entry)),
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let listing = match self.bridge.readdir(ino) {
            Ok(listing) => listing,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };
        let start = offset.max(0) as usize;
        for (idx, (ino, kind, name)) in listing.into_iter().enumerate().skip(start) {
            if reply.add(ino, (idx + 1) as i64, file_type(kind), name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.bridge.open(ino, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        match self.bridge.create(parent, &name.to_string_lossy()) {
            Ok((entry, fh)) => reply.created(&TTL, &self.attr_for(entry), 0, fh, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.bridge.read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(errno) => reply.error(errno),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.bridge.write(fh, offset, data) {
            Ok(written) => reply.written(written),
            Err(errno) => reply.error(errno),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        match self.bridge.flush(fh) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty) {
        match self.bridge.flush(fh) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.bridge.release(fh) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.bridge.unlink(parent, &name.to_string_lossy()) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        match self.bridge.mkdir(parent, &name.to_string_lossy()) {
            Ok(entry) => reply.entry(&TTL, &self.attr_for(entry), 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.bridge.rmdir(parent, &name.to_string_lossy()) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let result = self.bridge.rename(
            parent,
            &name.to_string_lossy(),
            newparent,
            &newname.to_string_lossy(),
        );
        match result {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }
}

/// Mount `fs` at `at` and serve requests until it is unmounted.
///
/// Blocks the calling thread, which must not belong to `runtime`.
pub fn mount<F: PathFs + 'static>(
    fs: Arc<F>,
    at: &Path,
    runtime: Handle,
    config: &MountConfig,
) -> Result<()> {
    let mut options = vec![
        MountOption::FSName("wikifs".to_owned()),
        MountOption::AutoUnmount,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }

    tracing::info!("Mounting wikifs on {}", at.display());
    fuser::mount2(WikiFuse::new(fs, runtime), at, &options)
        .with_context(|| format!("mount {}", at.display()))?;
    tracing::info!("Unmounted {}", at.display());
    Ok(())
}
