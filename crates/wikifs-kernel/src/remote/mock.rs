//! In-memory wiki for tests.
//!
//! `MockTransport` answers edit-view GETs from a page map, records submits
//! (and applies them to the map so a later fetch sees the new revision), and
//! replays a canned login response.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::error::{RemoteError, RemoteResult};
use super::transport::{Method, Transport, WikiRequest, WikiResponse};

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<String, String>,
    requests: Vec<WikiRequest>,
    login_response: Option<WikiResponse>,
    submit_status: Option<u16>,
    fail_fetches: bool,
    fail_submits: bool,
}

/// A scripted wiki.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source of a page.
    pub fn with_page(self, title: &str, source: &str) -> Self {
        self.set_page(title, source);
        self
    }

    pub fn set_page(&self, title: &str, source: &str) {
        self.state
            .lock()
            .pages
            .insert(title.to_string(), source.to_string());
    }

    /// Current source of a page as the wiki sees it.
    pub fn page(&self, title: &str) -> Option<String> {
        self.state.lock().pages.get(title).cloned()
    }

    /// Canned answer for the login POST.
    pub fn set_login_response(&self, response: WikiResponse) {
        self.state.lock().login_response = Some(response);
    }

    /// Make submits answer with this status (and not apply).
    pub fn set_submit_status(&self, status: u16) {
        self.state.lock().submit_status = Some(status);
    }

    /// Make every fetch fail at the transport level.
    pub fn set_fail_fetches(&self, fail: bool) {
        self.state.lock().fail_fetches = fail;
    }

    /// Make every submit fail at the transport level.
    pub fn set_fail_submits(&self, fail: bool) {
        self.state.lock().fail_submits = fail;
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<WikiRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of edit-view fetches of `title`.
    pub fn fetch_count(&self, title: &str) -> usize {
        self.count(Method::Get, "edit", title)
    }

    /// Number of submits of `title`.
    pub fn submit_count(&self, title: &str) -> usize {
        self.count(Method::Post, "submit", title)
    }

    /// The most recent submit of `title`.
    pub fn last_submit(&self, title: &str) -> Option<WikiRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|r| {
                r.method == Method::Post
                    && r.query_value("action") == Some("submit")
                    && r.query_value("title") == Some(title)
            })
            .cloned()
    }

    fn count(&self, method: Method, action: &str, title: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| {
                r.method == method
                    && r.query_value("action") == Some(action)
                    && r.query_value("title") == Some(title)
            })
            .count()
    }
}

/// Render a MediaWiki-like edit view around `source`.
pub fn edit_page_html(source: &str, edit_time: &str, start_time: &str, token: &str) -> String {
    let escaped = source
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Editing</title></head>
<body>
<form id="editform" name="editform" method="post" action="/w/index.php?action=submit">
<input type='hidden' value="{start_time}" name="wpStarttime" />
<input type='hidden' value="{edit_time}" name="wpEdittime" />
<textarea tabindex="1" accesskey="," name="wpTextbox1" id="wpTextbox1" rows="25" cols="80">{escaped}</textarea>
<input name="wpSummary" id="wpSummary" maxlength="200" size="60" value="" />
<input type="hidden" value="{token}" name="wpEditToken" />
</form>
</body></html>
"#
    )
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: WikiRequest) -> RemoteResult<WikiResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        let title = request.query_value("title").unwrap_or_default().to_string();
        match (request.method, request.query_value("action")) {
            (Method::Get, Some("edit")) => {
                if state.fail_fetches {
                    return Err(RemoteError::transport("connection refused"));
                }
                let source = state.pages.get(&title).cloned().unwrap_or_default();
                let revision = state.requests.len();
                Ok(WikiResponse::new(
                    200,
                    edit_page_html(
                        &source,
                        &format!("2024010100000{}", revision % 10),
                        "20240101000000",
                        "token+\\",
                    ),
                ))
            }
            (Method::Post, Some("submit")) if title == "Special:Userlogin" => Ok(state
                .login_response
                .clone()
                .unwrap_or_else(|| WikiResponse::new(200, "login failed"))),
            (Method::Post, Some("submit")) => {
                if state.fail_submits {
                    return Err(RemoteError::transport("connection reset"));
                }
                if let Some(status) = state.submit_status {
                    return Ok(WikiResponse::new(status, "error"));
                }
                let body = request.form_value("wpTextbox1").unwrap_or_default().to_string();
                state.pages.insert(title, body);
                Ok(WikiResponse::new(302, ""))
            }
            _ => Ok(WikiResponse::new(404, "")),
        }
    }
}
