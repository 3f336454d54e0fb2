//! Remote wiki access.
//!
//! - [`Transport`] - one HTTP round trip, implemented by [`HttpTransport`]
//! - [`SiteClient`] - a site plus its transport and cache TTL
//! - [`Page`] - one document with its TTL cache and edit tokens
//! - [`login`] - session cookie derivation

mod client;
mod edit_form;
mod error;
mod http;
mod page;
mod session;
mod transport;

#[cfg(any(test, feature = "test-mock"))]
pub mod mock;

pub use client::SiteClient;
pub use edit_form::{EditForm, EditTokens, scan_edit_form};
pub use error::{RemoteError, RemoteResult};
pub use http::{HttpTransport, TransportOptions};
pub use page::Page;
pub use session::{LOGIN_COOKIE_COUNT, cookie_pairs, login, session_cookie};
pub use transport::{Method, Transport, WikiRequest, WikiResponse};
