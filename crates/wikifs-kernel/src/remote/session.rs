//! Wiki login and session cookie derivation.

use regex::Regex;
use std::sync::LazyLock;

use super::transport::{Transport, WikiResponse};
use crate::site::Site;

/// Number of cookies a successful login sets.
///
/// Matches the MediaWiki deployments this was written against: session,
/// user name, user id and token. The last one is not sent back.
// TODO: make the expected count a per-site setting; other wiki versions set
// a different number of cookies and are treated as failed logins.
pub const LOGIN_COOKIE_COUNT: usize = 4;

static COOKIE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^=;\s]+=[^;\s]*)").expect("cookie pattern is valid")
});

/// Extract the leading `name=value` pair of every `Set-Cookie` header.
pub fn cookie_pairs(set_cookies: &[String]) -> Vec<String> {
    set_cookies
        .iter()
        .filter_map(|header| COOKIE_PAIR.captures(header))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Turn a login response into a reusable `Cookie` header value.
///
/// Requires exactly [`LOGIN_COOKIE_COUNT`] pairs; the last pair is dropped and
/// the rest are joined with `"; "`.
pub fn session_cookie(response: &WikiResponse) -> Option<String> {
    if !response.is_success() {
        return None;
    }
    let mut pairs = cookie_pairs(&response.set_cookies);
    if pairs.len() != LOGIN_COOKIE_COUNT {
        return None;
    }
    pairs.pop();
    Some(pairs.join("; "))
}

/// Log in to `site` and return the session cookie header.
///
/// Failures are logged and yield `None`; the caller keeps going anonymously.
pub async fn login(site: &Site, transport: &dyn Transport) -> Option<String> {
    let request = site.login_request()?;
    let username = site
        .login
        .as_ref()
        .map(|l| l.username.as_str())
        .unwrap_or_default();

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Could not login to {} as {}: {}", site.host, username, e);
            return None;
        }
    };

    if !response.is_success() {
        tracing::error!(
            "Could not login to {} ({}); response body was {}",
            site.host,
            response.status,
            response.body
        );
        return None;
    }

    for header in &response.set_cookies {
        tracing::debug!("Set-Cookie: {}", header);
    }

    match session_cookie(&response) {
        Some(cookie) => {
            tracing::info!("Logged in to {} as {}", site.host, username);
            Some(cookie)
        }
        None => {
            tracing::error!(
                "Could not login to {}: expected {} cookies, got {}",
                site.host,
                LOGIN_COOKIE_COUNT,
                cookie_pairs(&response.set_cookies).len()
            );
            None
        }
    }
}
