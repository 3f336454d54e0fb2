//! Mount configuration.
//!
//! One TOML file holds the general settings and one `[[sites]]` table per
//! wiki. A missing file is created from [`DEFAULT_CONFIG`] so there is
//! something to edit.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::remote::TransportOptions;
use crate::site::{Credentials, HTTP_PORT, HTTPS_PORT, Site};
use crate::vfs::{DEFAULT_SUFFIX, NamePolicy};

/// Embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../../../assets/defaults/config.toml");

/// Config file name inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Errors from loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Settings shared by every site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeneralConfig {
    /// Seconds a fetched document stays authoritative.
    pub article_cache_time: u64,
    pub document_suffix: String,
    pub connect_timeout: u64,
    pub request_timeout: u64,
    pub debug: bool,
    /// Log file, relative to the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            article_cache_time: 300,
            document_suffix: DEFAULT_SUFFIX.to_string(),
            connect_timeout: 10,
            request_timeout: 30,
            debug: false,
            log_file: None,
        }
    }
}

impl GeneralConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.article_cache_time)
    }

    pub fn name_policy(&self) -> NamePolicy {
        NamePolicy::new(self.document_suffix.clone())
    }

    /// Timeouts for every transport; the proxy comes from the environment.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            request_timeout: Duration::from_secs(self.request_timeout),
            proxy: None,
        }
        .with_env_proxy()
    }
}

/// One `[[sites]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    pub dirname: String,
    pub host: String,
    pub basename: String,

    /// Defaults to 80, or 443 with `https`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub https: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub httpauth_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub httpauth_password: Option<String>,

    /// Pre-established session cookie; login is skipped when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,

    #[serde(default)]
    pub tls_insecure: bool,
}

impl SiteConfig {
    /// Build the site record. Credentials need both halves to count.
    pub fn to_site(&self) -> Site {
        let mut site = Site::new(&self.dirname, &self.host, &self.basename);
        if self.https {
            site = site.with_https();
        }
        if let Some(port) = self.port {
            site = site.with_port(port);
        }
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            site = site.with_login(Credentials::new(user, pass));
        }
        if let (Some(user), Some(pass)) = (&self.httpauth_username, &self.httpauth_password) {
            site = site.with_basic_auth(Credentials::new(user, pass));
        }
        site.domain = self.domain.clone();
        site.tls_insecure = self.tls_insecure;
        site.with_cookie(self.cookie.clone())
    }

    /// Port the site will actually use.
    pub fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.https { HTTPS_PORT } else { HTTP_PORT })
    }
}

impl Config {
    /// Parse and validate a config document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, failing when the file is missing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path`, writing the default config there first if needed.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                create_private_dir(parent)?;
            }
            std::fs::write(path, DEFAULT_CONFIG)?;
            tracing::info!(path = %path.display(), "created config from default");
        }
        let config = Self::load(path)?;
        tracing::debug!(path = %path.display(), sites = config.sites.len(), "loaded config");
        Ok(config)
    }

    /// `<config dir>/wikifs/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wikifs").join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.document_suffix.is_empty() {
            return Err(ConfigError::invalid("document-suffix must not be empty"));
        }
        if self.general.connect_timeout == 0 {
            return Err(ConfigError::invalid("connect-timeout must be at least 1 second"));
        }
        if self.general.request_timeout == 0 {
            return Err(ConfigError::invalid("request-timeout must be at least 1 second"));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.dirname.is_empty() {
                return Err(ConfigError::invalid("site dirname must not be empty"));
            }
            if site.dirname.contains('/') || site.dirname == "." || site.dirname == ".." {
                return Err(ConfigError::invalid(format!(
                    "site dirname {:?} is not a plain directory name",
                    site.dirname
                )));
            }
            if site.host.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "site {} has no host",
                    site.dirname
                )));
            }
            if !site.basename.starts_with('/') {
                return Err(ConfigError::invalid(format!(
                    "site {} basename {:?} must start with /",
                    site.dirname, site.basename
                )));
            }
            if !seen.insert(site.dirname.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate site dirname {}",
                    site.dirname
                )));
            }
        }
        Ok(())
    }

    /// Resolve the log file against the config file's directory.
    pub fn log_path(&self, config_path: &Path) -> Option<PathBuf> {
        let log_file = self.general.log_file.as_ref()?;
        if log_file.is_absolute() {
            return Some(log_file.clone());
        }
        Some(
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(log_file),
        )
    }
}

/// The config holds passwords; keep its directory private.
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}
