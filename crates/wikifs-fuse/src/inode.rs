//! Inode numbers for tree paths.

use std::collections::HashMap;

/// Inode of the mount root.
pub const ROOT_INODE: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeEntry {
    pub path: String,
    pub is_dir: bool,
}

/// Stable inode ↔ path mapping. Numbers are never reused.
#[derive(Debug)]
pub struct InodeTable {
    by_inode: HashMap<u64, InodeEntry>,
    by_path: HashMap<String, u64>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        let mut table = Self {
            by_inode: HashMap::new(),
            by_path: HashMap::new(),
            next_inode: ROOT_INODE + 1,
        };
        table.insert("/", true);
        table
    }
}

impl InodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inode for `path`, allocating one on first sight.
    pub fn insert(&mut self, path: &str, is_dir: bool) -> u64 {
        if let Some(existing) = self.by_path.get(path) {
            if let Some(entry) = self.by_inode.get_mut(existing) {
                entry.is_dir = is_dir;
            }
            return *existing;
        }
        let inode = if path == "/" {
            ROOT_INODE
        } else {
            let inode = self.next_inode;
            self.next_inode += 1;
            inode
        };
        self.by_inode.insert(
            inode,
            InodeEntry {
                path: path.to_owned(),
                is_dir,
            },
        );
        self.by_path.insert(path.to_owned(), inode);
        inode
    }

    pub fn path_for(&self, inode: u64) -> Option<&InodeEntry> {
        self.by_inode.get(&inode)
    }

    pub fn remove(&mut self, path: &str) {
        if let Some(inode) = self.by_path.remove(path) {
            self.by_inode.remove(&inode);
        }
    }

    /// Move `from`'s inode to `to`, dropping whatever `to` had.
    pub fn rename(&mut self, from: &str, to: &str) {
        self.remove(to);
        if let Some(inode) = self.by_path.remove(from) {
            if let Some(entry) = self.by_inode.get_mut(&inode) {
                entry.path = to.to_owned();
            }
            self.by_path.insert(to.to_owned(), inode);
        }
    }
}

/// Path of `name` inside `parent`.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}
