//! Startup: logging, site sessions and the tree.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wikifs_kernel::remote::{HttpTransport, SiteClient, Transport, login};
use wikifs_kernel::{Config, Site, WikiTree};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `debug`. With a log file, events go there instead of
/// stderr; keep the returned guard alive until exit so the file is flushed.
pub fn init_tracing(debug: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    let Some(path) = log_file else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("install tracing subscriber")?;
        return Ok(None);
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    registry
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("install tracing subscriber")?;
    Ok(Some(guard))
}

/// Build the tree for `config`, talking HTTP to every site.
pub async fn build_tree(config: &Config) -> Result<WikiTree> {
    let options = config.general.transport_options();
    build_tree_with(config, |site| {
        let transport = HttpTransport::new(site, &options)
            .with_context(|| format!("HTTP client for {}", site.host))?;
        Ok(Arc::new(transport) as Arc<dyn Transport>)
    })
    .await
}

/// Build the tree with a caller-chosen transport per site.
///
/// Sites with an account and no preset cookie log in first. A failed login
/// leaves that site anonymous rather than failing the mount.
pub async fn build_tree_with<M>(config: &Config, mut make_transport: M) -> Result<WikiTree>
where
    M: FnMut(&Site) -> Result<Arc<dyn Transport>>,
{
    let ttl = config.general.cache_ttl();
    let mut clients = Vec::with_capacity(config.sites.len());

    for site_config in &config.sites {
        let mut site = site_config.to_site();
        let transport = make_transport(&site)?;

        if site.cookie.is_none() && site.login.is_some() {
            let cookie = login(&site, transport.as_ref()).await;
            if cookie.is_some() {
                tracing::info!("Logged in to {}", site.host);
            }
            site = site.with_cookie(cookie);
        }

        tracing::debug!("Mounting {} as /{}", site.endpoint(), site.dirname);
        clients.push(Arc::new(SiteClient::new(site, transport, ttl)));
    }

    Ok(WikiTree::new(config.general.name_policy(), clients))
}
