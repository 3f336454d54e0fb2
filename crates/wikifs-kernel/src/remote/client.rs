//! Per-site context shared by every page of a wiki.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::edit_form::{EditForm, scan_edit_form};
use super::error::{RemoteError, RemoteResult};
use super::transport::{Transport, WikiResponse};
use crate::site::Site;

/// A site, the transport that reaches it, and the article cache TTL.
pub struct SiteClient {
    site: Site,
    transport: Arc<dyn Transport>,
    cache_ttl: Duration,
}

impl fmt::Debug for SiteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteClient")
            .field("site", &self.site)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl SiteClient {
    pub fn new(site: Site, transport: Arc<dyn Transport>, cache_ttl: Duration) -> Self {
        Self {
            site,
            transport,
            cache_ttl,
        }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// GET the edit view of `title` and scan it.
    pub async fn fetch(&self, title: &str) -> RemoteResult<EditForm> {
        let response = self.transport.send(self.site.edit_request(title)).await?;
        if !(200..300).contains(&response.status) {
            return Err(RemoteError::status(
                response.status,
                format!("{}?title={}&action=edit", self.site.basename, title),
            ));
        }
        scan_edit_form(&response.body)
    }

    /// POST a new revision of `title`. The status is left to the caller.
    pub async fn submit(
        &self,
        title: &str,
        form: Vec<(String, String)>,
    ) -> RemoteResult<WikiResponse> {
        self.transport
            .send(self.site.submit_request(title, form))
            .await
    }
}
