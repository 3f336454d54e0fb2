//! Per-open-file buffers.
//!
//! The tree only reads and saves whole documents, while the kernel reads
//! and writes at offsets. Each open handle therefore holds the file's bytes;
//! writes patch the buffer and mark it dirty, and the bridge saves the
//! whole buffer when the handle is flushed or released.

use std::collections::HashMap;

/// Largest file a handle will buffer. Well above what wikis accept
/// (MediaWiki defaults to 2 MiB per revision).
pub const MAX_FILE_SIZE: u64 = 32 * 1024 * 1024;

/// One open file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub path: String,
    data: Vec<u8>,
    dirty: bool,
}

impl OpenFile {
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
            dirty: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Bytes in `[offset, offset + size)`, clipped to the end.
    pub fn read_at(&self, offset: u64, size: u32) -> &[u8] {
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(size as usize).min(self.data.len());
        &self.data[start..end]
    }

    /// Overwrite at `offset`, zero-filling any gap. Returns bytes written,
    /// or `None` if the file would grow past [`MAX_FILE_SIZE`].
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Option<usize> {
        let end = offset
            .checked_add(bytes.len() as u64)
            .filter(|end| *end <= MAX_FILE_SIZE)?;
        let (start, end) = (offset as usize, end as usize);
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
        self.dirty = true;
        Some(bytes.len())
    }

    /// Resize to `size`. `None`, leaving the buffer alone, past [`MAX_FILE_SIZE`].
    pub fn truncate(&mut self, size: u64) -> Option<()> {
        if size > MAX_FILE_SIZE {
            return None;
        }
        self.data.resize(size as usize, 0);
        self.dirty = true;
        Some(())
    }

    /// Buffer as document text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Contents to save, if there is anything unsaved. Clears the dirty flag.
    pub fn take_unsaved(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.contents())
    }
}

/// Open files by handle number.
#[derive(Debug)]
pub struct HandleTable {
    open: HashMap<u64, OpenFile>,
    next: u64,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self {
            open: HashMap::new(),
            next: 1,
        }
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: OpenFile) -> u64 {
        let fh = self.next;
        self.next += 1;
        self.open.insert(fh, file);
        fh
    }

    pub fn get(&self, fh: u64) -> Option<&OpenFile> {
        self.open.get(&fh)
    }

    pub fn get_mut(&mut self, fh: u64) -> Option<&mut OpenFile> {
        self.open.get_mut(&fh)
    }

    pub fn remove(&mut self, fh: u64) -> Option<OpenFile> {
        self.open.remove(&fh)
    }

    /// Every open handle on `path`.
    pub fn for_path_mut<'a>(&'a mut self, path: &'a str) -> impl Iterator<Item = &'a mut OpenFile> {
        self.open.values_mut().filter(move |file| file.path == path)
    }

    /// Size of the newest unsaved buffer on `path`, if any.
    pub fn unsaved_len(&self, path: &str) -> Option<u64> {
        self.open
            .iter()
            .filter(|(_, file)| file.path == path && file.dirty)
            .max_by_key(|(fh, _)| **fh)
            .map(|(_, file)| file.len())
    }

    /// Point handles on `from` at `to` after a rename.
    pub fn rename(&mut self, from: &str, to: &str) {
        for file in self.for_path_mut(from) {
            file.path = to.to_string();
        }
    }
}
