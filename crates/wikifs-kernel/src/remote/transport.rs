//! HTTP transport seam.
//!
//! Every round trip to a wiki goes through [`Transport`]. A transport is bound
//! to one site: it knows the scheme, host, port and script path, and applies
//! HTTP Basic auth when the site is configured for it. Requests only carry what
//! varies per call (query, form fields, session cookie).

use async_trait::async_trait;
use std::fmt;

use super::error::RemoteResult;

/// HTTP method used by the wiki protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// One request against a site's script path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiRequest {
    pub method: Method,
    /// Query pairs appended to the script path, in order.
    pub query: Vec<(String, String)>,
    /// Form fields, sent `application/x-www-form-urlencoded` on POST.
    pub form: Vec<(String, String)>,
    /// Value of the `Cookie` header, if a session is known.
    pub cookie: Option<String>,
}

impl WikiRequest {
    /// Create a GET request with the given query pairs.
    pub fn get<K, V>(query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::Get,
            query: pairs(query),
            form: Vec::new(),
            cookie: None,
        }
    }

    /// Create a form POST with the given query pairs and fields.
    pub fn post<K, V, FK, FV>(
        query: impl IntoIterator<Item = (K, V)>,
        form: impl IntoIterator<Item = (FK, FV)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        FK: Into<String>,
        FV: Into<String>,
    {
        Self {
            method: Method::Post,
            query: pairs(query),
            form: pairs(form),
            cookie: None,
        }
    }

    /// Attach a session cookie header.
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    /// Look up a query value by key.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        lookup(&self.query, key)
    }

    /// Look up a form value by key.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        lookup(&self.form, key)
    }
}

fn pairs<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Vec<(String, String)>
where
    K: Into<String>,
    V: Into<String>,
{
    items
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// The parts of an HTTP response the wiki protocol cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikiResponse {
    pub status: u16,
    /// Raw values of every `Set-Cookie` header, in arrival order.
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl WikiResponse {
    /// Create a response with a status and body and no cookies.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            set_cookies: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a `Set-Cookie` header value.
    pub fn with_set_cookie(mut self, value: impl Into<String>) -> Self {
        self.set_cookies.push(value.into());
        self
    }

    /// 2xx and 3xx count as success; wikis answer logins and saves with redirects.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Sends requests to one wiki site.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one round trip. Non-success statuses are returned, not raised.
    async fn send(&self, request: WikiRequest) -> RemoteResult<WikiResponse>;
}
