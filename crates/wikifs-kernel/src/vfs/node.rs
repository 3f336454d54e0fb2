//! Tree nodes.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::remote::Page;

/// Index of a directory in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(pub(crate) usize);

/// Entry of a directory.
#[derive(Debug, Clone)]
pub enum Node {
    Directory(DirId),
    Page(Arc<Page>),
    Swap(Arc<SwapFile>),
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }
}

/// In-memory placeholder for an editor's auxiliary file.
#[derive(Debug, Default)]
pub struct SwapFile {
    body: Mutex<String>,
}

impl SwapFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.body.lock().clone()
    }

    pub fn set(&self, body: &str) {
        *self.body.lock() = body.to_string();
    }
}
