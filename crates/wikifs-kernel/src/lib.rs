//! # wikifs-kernel
//!
//! Core of wikifs: a MediaWiki site mounted as a directory tree.
//!
//! Each wiki document appears as a file named `<title>.mw` under the
//! directory of its site. Reading the file fetches the document source from
//! the wiki's edit view; writing it submits a new revision. Nothing here
//! knows about the kernel bridge: the FUSE crate drives a [`WikiTree`]
//! through the path-level [`PathFs`] trait.
//!
//! - [`remote`] - transport, edit-form scanning, login and cached pages
//! - [`vfs`] - the directory tree and its path contract
//! - [`config`] - TOML mount configuration

pub mod config;
pub mod remote;
pub mod site;
pub mod vfs;

pub use config::{Config, ConfigError, GeneralConfig, SiteConfig};
pub use remote::{
    HttpTransport, Page, RemoteError, RemoteResult, SiteClient, Transport, TransportOptions,
    WikiRequest, WikiResponse, login,
};
pub use site::{Credentials, Site};
pub use vfs::{FsError, FsResult, NamePolicy, PathFs, WikiTree};
