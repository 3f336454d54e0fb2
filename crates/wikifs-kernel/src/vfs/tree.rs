//! The mounted directory tree.
//!
//! The root holds one directory per configured site. Site directories hold
//! documents, created lazily the first time a path is probed, and swap files
//! created by writes. Directories live in an arena owned by the tree and are
//! referenced by [`DirId`]; `..` is just another id.
//!
//! Each directory guards its entries with its own lock, held only for a
//! single lookup or mutation and never across a network round trip. Lazy
//! installation is insert-if-absent, so when a probe races a write the entry
//! that landed first is kept.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::names::NamePolicy;
use super::node::{DirId, Node, SwapFile};
use super::ops::PathFs;
use super::path::{scan_path, split_path};
use super::{FsError, FsResult};
use crate::remote::{Page, SiteClient};

const ROOT: DirId = DirId(0);
const SELF_ENTRY: &str = ".";
const PARENT_ENTRY: &str = "..";

#[derive(Debug)]
struct Directory {
    entries: Mutex<BTreeMap<String, Node>>,
    /// Site the documents of this directory belong to. `None` at the root.
    client: Option<Arc<SiteClient>>,
}

impl Directory {
    fn new(id: DirId, parent: Option<DirId>, client: Option<Arc<SiteClient>>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(SELF_ENTRY.to_string(), Node::Directory(id));
        if let Some(parent) = parent {
            entries.insert(PARENT_ENTRY.to_string(), Node::Directory(parent));
        }
        Self {
            entries: Mutex::new(entries),
            client,
        }
    }

    fn get(&self, name: &str) -> Option<Node> {
        self.entries.lock().get(name).cloned()
    }

    /// Insert `node` unless `name` is taken; return whichever entry is there.
    fn insert_if_absent(&self, name: &str, node: Node) -> Node {
        self.entries
            .lock()
            .entry(name.to_string())
            .or_insert(node)
            .clone()
    }

    fn remove(&self, name: &str) -> Option<Node> {
        self.entries.lock().remove(name)
    }

    fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|name| *name != SELF_ENTRY && *name != PARENT_ENTRY)
            .cloned()
            .collect()
    }
}

/// A resolved path: its parent directory, leaf name and current entry.
struct Resolved {
    dir: DirId,
    leaf: String,
    node: Option<Node>,
}

/// Directory tree over one or more wiki sites.
#[derive(Debug)]
pub struct WikiTree {
    dirs: Vec<Directory>,
    names: NamePolicy,
}

impl WikiTree {
    /// Build the root and one directory per site, named after the site's
    /// `dirname`. A second site with the same dirname is ignored.
    pub fn new(names: NamePolicy, sites: impl IntoIterator<Item = Arc<SiteClient>>) -> Self {
        let mut dirs = vec![Directory::new(ROOT, None, None)];

        for client in sites {
            let dirname = client.site().dirname.clone();
            let id = DirId(dirs.len());
            let installed = dirs[ROOT.0].insert_if_absent(&dirname, Node::Directory(id));
            if !matches!(installed, Node::Directory(existing) if existing == id) {
                tracing::warn!("Ignoring duplicate site directory {}", dirname);
                continue;
            }
            dirs.push(Directory::new(id, Some(ROOT), Some(client)));
        }

        Self { dirs, names }
    }

    pub fn names(&self) -> &NamePolicy {
        &self.names
    }

    fn dir(&self, id: DirId) -> &Directory {
        &self.dirs[id.0]
    }

    /// Walk `path` from the root; every component must be a directory.
    fn resolve_dir(&self, path: &str) -> FsResult<DirId> {
        let mut current = ROOT;
        for segment in scan_path(path) {
            match self.dir(current).get(segment) {
                Some(Node::Directory(id)) => current = id,
                Some(_) => return Err(FsError::not_a_directory(path)),
                None => return Err(FsError::not_found(path)),
            }
        }
        Ok(current)
    }

    fn resolve(&self, path: &str) -> FsResult<Resolved> {
        let (parent, leaf) = split_path(path);
        let dir = self.resolve_dir(&parent)?;
        let node = self.dir(dir).get(&leaf);
        Ok(Resolved { dir, leaf, node })
    }

    /// Entry at `path`, probing the wiki for a document name with no entry.
    ///
    /// An empty remote body means the document does not exist; nothing is
    /// remembered in that case, so the next probe asks again.
    async fn materialize(&self, path: &str) -> FsResult<Option<Node>> {
        let Resolved { dir, leaf, node } = self.resolve(path)?;
        if node.is_some() {
            return Ok(node);
        }
        let (Some(title), Some(client)) = (self.names.title(&leaf), &self.dir(dir).client)
        else {
            return Ok(None);
        };

        tracing::debug!("Probing {} for {}", client.site().host, path);
        let page = Arc::new(Page::new(client.clone(), title));
        if page.get().await?.is_empty() {
            tracing::debug!("{} has no content", path);
            return Ok(None);
        }
        Ok(Some(self.dir(dir).insert_if_absent(&leaf, Node::Page(page))))
    }

    /// Fresh entry for a write to `leaf` in `dir`.
    fn new_node(&self, dir: DirId, leaf: &str, path: &str) -> FsResult<Node> {
        match self.names.title(leaf) {
            Some(title) => {
                let client = self
                    .dir(dir)
                    .client
                    .clone()
                    .ok_or_else(|| FsError::permission_denied(path))?;
                Ok(Node::Page(Arc::new(Page::new(client, title))))
            }
            None => Ok(Node::Swap(Arc::new(SwapFile::new()))),
        }
    }
}

#[async_trait]
impl PathFs for WikiTree {
    async fn is_directory(&self, path: &str) -> bool {
        let is_dir = matches!(
            self.resolve(path),
            Ok(Resolved { node: Some(Node::Directory(_)), .. })
        );
        tracing::trace!("is_directory {} = {}", path, is_dir);
        is_dir
    }

    async fn list(&self, path: &str) -> FsResult<Vec<String>> {
        match self.resolve(path)?.node {
            Some(Node::Directory(id)) => Ok(self.dir(id).names()),
            Some(_) => Err(FsError::not_a_directory(path)),
            None => Err(FsError::not_found(path)),
        }
    }

    async fn is_file(&self, path: &str) -> bool {
        match self.probe_file(path).await {
            Ok(is_file) => is_file,
            Err(e) => {
                tracing::warn!("Could not probe {}: {}", path, e);
                false
            }
        }
    }

    async fn probe_file(&self, path: &str) -> FsResult<bool> {
        match self.materialize(path).await {
            Ok(node) => Ok(node.is_some_and(|n| !n.is_directory())),
            Err(FsError::Remote(e)) => Err(FsError::Remote(e)),
            Err(_) => Ok(false),
        }
    }

    async fn read(&self, path: &str) -> FsResult<String> {
        match self.materialize(path).await? {
            Some(Node::Page(page)) => Ok(page.get().await?),
            Some(Node::Swap(swap)) => Ok(swap.get()),
            Some(Node::Directory(_)) => Err(FsError::is_a_directory(path)),
            None => Err(FsError::not_found(path)),
        }
    }

    async fn can_write(&self, path: &str) -> bool {
        let Ok(Resolved { dir, leaf, node }) = self.resolve(path) else {
            return false;
        };
        match node {
            Some(node) => !node.is_directory(),
            None if self.names.is_document(&leaf) => self.dir(dir).client.is_some(),
            None => self.names.is_writable(&leaf),
        }
    }

    async fn write(&self, path: &str, content: &str) -> FsResult<()> {
        let Resolved { dir, leaf, node } = self.resolve(path)?;
        if !self.names.is_writable(&leaf) && node.is_none() {
            return Err(FsError::permission_denied(path));
        }

        let node = match node {
            Some(node) => node,
            None => {
                let fresh = self.new_node(dir, &leaf, path)?;
                self.dir(dir).insert_if_absent(&leaf, fresh)
            }
        };

        if content.trim().is_empty() {
            tracing::debug!("Ignoring blank write to {}", path);
            return match node {
                Node::Directory(_) => Err(FsError::is_a_directory(path)),
                _ => Ok(()),
            };
        }

        match node {
            Node::Page(page) => {
                tracing::debug!("Saving {} ({} bytes)", path, content.len());
                page.set(content).await;
                Ok(())
            }
            Node::Swap(swap) => {
                swap.set(content);
                Ok(())
            }
            Node::Directory(_) => Err(FsError::is_a_directory(path)),
        }
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        let (parent, leaf) = split_path(path);
        if leaf == SELF_ENTRY || leaf == PARENT_ENTRY {
            return Err(FsError::permission_denied(path));
        }
        let dir = self.resolve_dir(&parent)?;
        if self.dir(dir).remove(&leaf).is_some() {
            tracing::debug!("Detached {}", path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockTransport;
    use crate::site::Site;
    use std::time::Duration;

    fn tree_with(transport: &Arc<MockTransport>) -> WikiTree {
        let client = SiteClient::new(
            Site::new("wiki", "wiki.example.org", "/w/index.php"),
            transport.clone(),
            Duration::from_secs(300),
        );
        WikiTree::new(NamePolicy::default(), [Arc::new(client)])
    }

    #[tokio::test]
    async fn test_root_lists_sites() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(tree.is_directory("/").await);
        assert!(tree.is_directory("/wiki").await);
        assert!(tree.is_directory("/wiki/..").await);
        assert!(!tree.is_file("/wiki").await);
        assert_eq!(tree.list("/").await.unwrap(), vec!["wiki"]);
        assert!(tree.list("/wiki").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_site_is_ignored() {
        let transport = Arc::new(MockTransport::new());
        let client = |host: &str| {
            Arc::new(SiteClient::new(
                Site::new("wiki", host, "/w/index.php"),
                transport.clone(),
                Duration::from_secs(300),
            ))
        };
        let tree = WikiTree::new(NamePolicy::default(), [client("a.org"), client("b.org")]);
        assert_eq!(tree.list("/").await.unwrap(), vec!["wiki"]);
    }

    #[tokio::test]
    async fn test_lazy_existence() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        let tree = tree_with(&transport);

        assert!(tree.is_file("/wiki/Japon.mw").await);
        assert_eq!(tree.list("/wiki").await.unwrap(), vec!["Japon.mw"]);

        // Installed: no further probes.
        assert!(tree.is_file("/wiki/Japon.mw").await);
        assert_eq!(transport.fetch_count("Japon"), 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_cached() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(!tree.is_file("/wiki/Nulle.mw").await);
        assert!(tree.list("/wiki").await.unwrap().is_empty());
        assert!(matches!(
            tree.read("/wiki/Nulle.mw").await,
            Err(FsError::NotFound(_))
        ));

        transport.set_page("Nulle", "now it exists");
        assert!(tree.is_file("/wiki/Nulle.mw").await);
        assert_eq!(transport.fetch_count("Nulle"), 3);
    }

    #[tokio::test]
    async fn test_non_document_names_are_not_fetched() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        let tree = tree_with(&transport);

        assert!(!tree.is_file("/wiki/Japon").await);
        assert!(!tree.is_file("/Japon.mw").await);
        assert!(!tree.is_file("/nowhere/Japon.mw").await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_section_anchor_names_never_reach_the_wiki() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        let tree = tree_with(&transport);

        assert!(!tree.is_file("/wiki/Japon#Histoire.mw").await);
        assert!(!tree.can_write("/wiki/Japon#Histoire.mw").await);
        assert!(matches!(
            tree.write("/wiki/Japon#Histoire.mw", "Écrasé").await,
            Err(FsError::PermissionDenied(_))
        ));
        assert!(transport.requests().is_empty());
        assert_eq!(transport.page("Japon").as_deref(), Some("Tokyo"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_absence() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        transport.set_fail_fetches(true);
        let tree = tree_with(&transport);

        assert!(matches!(
            tree.probe_file("/wiki/Japon.mw").await,
            Err(FsError::Remote(_))
        ));
        assert!(!tree.is_file("/wiki/Japon.mw").await);
        assert!(matches!(
            tree.read("/wiki/Japon.mw").await,
            Err(FsError::Remote(_))
        ));

        // Missing paths are plain absence, not errors.
        assert!(!tree.probe_file("/nowhere/Japon.mw").await.unwrap());
        assert!(!tree.probe_file("/wiki").await.unwrap());

        transport.set_fail_fetches(false);
        assert!(tree.probe_file("/wiki/Japon.mw").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_and_size() {
        let transport = Arc::new(MockTransport::new().with_page("Été", "Saison chaude"));
        let tree = tree_with(&transport);

        assert_eq!(tree.read("/wiki/Été.mw").await.unwrap(), "Saison chaude");
        assert_eq!(tree.size("/wiki/Été.mw").await.unwrap(), 13);
        assert!(matches!(
            tree.read("/wiki").await,
            Err(FsError::IsADirectory(_))
        ));
        assert!(matches!(
            tree.list("/wiki/Été.mw").await,
            Err(FsError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_write_rejection() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(!tree.can_write("/wiki/Japon").await);
        assert!(matches!(
            tree.write("/wiki/Japon", "text").await,
            Err(FsError::PermissionDenied(_))
        ));
        assert!(!tree.can_write("/wiki").await);
        assert!(matches!(
            tree.write("/wiki", "text").await,
            Err(FsError::IsADirectory(_))
        ));
        assert!(!tree.can_write("/Japon.mw").await);
        assert!(!tree.can_write("/missing/Japon.mw").await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_swap_files() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(tree.can_write("/wiki/.Japon.mw.swp").await);
        tree.write("/wiki/.Japon.mw.swp", "b0VIM").await.unwrap();
        tree.write("/wiki/Japon.mw~", "backup").await.unwrap();

        assert!(tree.is_file("/wiki/.Japon.mw.swp").await);
        assert_eq!(tree.read("/wiki/.Japon.mw.swp").await.unwrap(), "b0VIM");
        assert_eq!(
            tree.list("/wiki").await.unwrap(),
            vec![".Japon.mw.swp", "Japon.mw~"]
        );

        tree.delete("/wiki/.Japon.mw.swp").await.unwrap();
        assert!(!tree.is_file("/wiki/.Japon.mw.swp").await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_write_is_a_no_op() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        let tree = tree_with(&transport);

        tree.write("/wiki/.scratch", "kept").await.unwrap();
        tree.write("/wiki/.scratch", "  \n\t").await.unwrap();
        assert_eq!(tree.read("/wiki/.scratch").await.unwrap(), "kept");

        tree.write("/wiki/Japon.mw", "\n").await.unwrap();
        assert_eq!(transport.submit_count("Japon"), 0);
        assert_eq!(tree.read("/wiki/Japon.mw").await.unwrap(), "Tokyo");
    }

    #[tokio::test]
    async fn test_write_round_trip() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(tree.can_write("/wiki/Nouveau.mw").await);
        tree.write("/wiki/Nouveau.mw", "Premier jet\n").await.unwrap();

        assert_eq!(transport.submit_count("Nouveau"), 1);
        assert_eq!(tree.read("/wiki/Nouveau.mw").await.unwrap(), "Premier jet");
        assert_eq!(tree.list("/wiki").await.unwrap(), vec!["Nouveau.mw"]);
    }

    #[tokio::test]
    async fn test_delete_then_reaccess() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        let tree = tree_with(&transport);

        assert!(tree.is_file("/wiki/Japon.mw").await);
        tree.delete("/wiki/Japon.mw").await.unwrap();
        assert!(tree.list("/wiki").await.unwrap().is_empty());

        // The document is still on the wiki and comes back on the next probe.
        assert!(tree.is_file("/wiki/Japon.mw").await);
        assert_eq!(transport.fetch_count("Japon"), 2);
        assert_eq!(transport.submit_count("Japon"), 0);
    }

    #[tokio::test]
    async fn test_delete_policy() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(tree.can_delete("/wiki/anything").await);
        tree.delete("/wiki/absent.mw").await.unwrap();
        assert!(matches!(
            tree.delete("/wiki/..").await,
            Err(FsError::PermissionDenied(_))
        ));
        assert!(matches!(
            tree.delete("/").await,
            Err(FsError::PermissionDenied(_))
        ));
        assert!(matches!(
            tree.delete("/missing/x").await,
            Err(FsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_directories_are_fixed() {
        let transport = Arc::new(MockTransport::new());
        let tree = tree_with(&transport);

        assert!(!tree.can_mkdir("/wiki/sub").await);
        tree.mkdir("/wiki/sub").await.unwrap();
        assert!(!tree.is_directory("/wiki/sub").await);

        assert!(!tree.can_rmdir("/wiki").await);
        tree.rmdir("/wiki").await.unwrap();
        assert!(tree.is_directory("/wiki").await);
    }

    #[tokio::test]
    async fn test_concurrent_lookup_and_write_keep_one_entry() {
        let transport = Arc::new(MockTransport::new().with_page("Japon", "Tokyo"));
        let tree = tree_with(&transport);

        let (found, write) = tokio::join!(
            tree.is_file("/wiki/Japon.mw"),
            tree.write("/wiki/Japon.mw", "Kyoto")
        );
        assert!(found);
        write.unwrap();
        assert_eq!(tree.list("/wiki").await.unwrap(), vec!["Japon.mw"]);
    }
}
