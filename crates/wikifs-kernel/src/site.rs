//! Wiki site records and the endpoints they expose.

use std::fmt;

use crate::remote::WikiRequest;

/// Default HTTP port.
pub const HTTP_PORT: u16 = 80;
/// Default HTTPS port.
pub const HTTPS_PORT: u16 = 443;

/// Username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One configured wiki.
///
/// Built once at mount time and shared read-only afterwards. The session
/// cookie is filled in by login before the site is handed to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Directory name under the mount root.
    pub dirname: String,
    pub host: String,
    pub port: u16,
    /// Script path, e.g. `/w/index.php`.
    pub basename: String,
    pub https: bool,
    /// Wiki account used for login.
    pub login: Option<Credentials>,
    /// Authentication domain for LDAP-backed wikis (`wpDomain`).
    pub domain: Option<String>,
    /// HTTP Basic auth applied to every request.
    pub basic_auth: Option<Credentials>,
    /// Reusable `Cookie` header value.
    pub cookie: Option<String>,
    /// Accept invalid TLS certificates.
    pub tls_insecure: bool,
}

impl Site {
    /// Create a plain-HTTP site on port 80.
    pub fn new(
        dirname: impl Into<String>,
        host: impl Into<String>,
        basename: impl Into<String>,
    ) -> Self {
        Self {
            dirname: dirname.into(),
            host: host.into(),
            port: HTTP_PORT,
            basename: basename.into(),
            https: false,
            login: None,
            domain: None,
            basic_auth: None,
            cookie: None,
            tls_insecure: false,
        }
    }

    /// Switch to HTTPS. Moves the port to 443 if it was still the HTTP default.
    pub fn with_https(mut self) -> Self {
        self.https = true;
        if self.port == HTTP_PORT {
            self.port = HTTPS_PORT;
        }
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_login(mut self, credentials: Credentials) -> Self {
        self.login = Some(credentials);
        self
    }

    pub fn with_basic_auth(mut self, credentials: Credentials) -> Self {
        self.basic_auth = Some(credentials);
        self
    }

    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.https { "https" } else { "http" }
    }

    /// Absolute URL of the script path, without query.
    pub fn endpoint(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme(),
            self.host,
            self.port,
            self.basename
        )
    }

    /// GET of the edit view of `title`.
    pub fn edit_request(&self, title: &str) -> WikiRequest {
        WikiRequest::get([("title", title), ("action", "edit")]).with_cookie(self.cookie.clone())
    }

    /// POST of a new revision of `title`.
    pub fn submit_request(&self, title: &str, form: Vec<(String, String)>) -> WikiRequest {
        WikiRequest::post([("title", title), ("action", "submit")], form)
            .with_cookie(self.cookie.clone())
    }

    /// POST of the login form, if the site has an account configured.
    pub fn login_request(&self) -> Option<WikiRequest> {
        let login = self.login.as_ref()?;
        let mut form = vec![
            ("wpName".to_string(), login.username.clone()),
            ("wpPassword".to_string(), login.password.clone()),
            ("wpLoginattempt".to_string(), "Identification".to_string()),
            ("wpRemember".to_string(), "1".to_string()),
        ];
        if let Some(domain) = &self.domain {
            form.push(("wpDomain".to_string(), domain.clone()));
        }
        Some(WikiRequest::post(
            [
                ("title", "Special:Userlogin"),
                ("action", "submit"),
                ("returnto", "Special:Userlogin"),
            ],
            form,
        ))
    }
}
