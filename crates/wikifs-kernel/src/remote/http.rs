//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, Url};
use std::time::Duration;

use super::error::{RemoteError, RemoteResult};
use super::transport::{Method, Transport, WikiRequest, WikiResponse};
use crate::site::{Credentials, Site};

/// Timeouts and proxy shared by every site of a mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Forward proxy, `host:port` or a full URL.
    pub proxy: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

impl TransportOptions {
    /// Pick up the forward proxy from `http_proxy` / `HTTP_PROXY`.
    pub fn with_env_proxy(mut self) -> Self {
        self.proxy = std::env::var("http_proxy")
            .or_else(|_| std::env::var("HTTP_PROXY"))
            .ok()
            .filter(|p| !p.trim().is_empty());
        self
    }
}

/// Transport for one site over HTTP(S).
///
/// Redirects are not followed: a login answers with a redirect whose
/// `Set-Cookie` headers must stay visible.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    basic_auth: Option<Credentials>,
}

impl HttpTransport {
    /// Build a transport for `site`.
    pub fn new(site: &Site, options: &TransportOptions) -> RemoteResult<Self> {
        let endpoint = Url::parse(&site.endpoint())
            .map_err(|e| RemoteError::invalid_url(format!("{}: {}", site.endpoint(), e)))?;

        let mut builder = Client::builder()
            .user_agent(concat!("wikifs/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(site.tls_insecure)
            .no_proxy();

        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(Proxy::all(proxy_url(proxy))?);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            basic_auth: site.basic_auth.clone(),
        })
    }

    /// The script URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `http_proxy` is often given without a scheme.
fn proxy_url(proxy: &str) -> String {
    let proxy = proxy.trim().trim_end_matches('/');
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WikiRequest) -> RemoteResult<WikiResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(self.endpoint.clone()),
            Method::Post => self.client.post(self.endpoint.clone()).form(&request.form),
        };
        builder = builder.query(&request.query);

        if let Some(cookie) = &request.cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(auth) = &self.basic_auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        tracing::debug!("HTTP {} {} {:?}", request.method, self.endpoint, request.query);
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.text().await?;

        Ok(WikiResponse {
            status,
            set_cookies,
            body,
        })
    }
}
