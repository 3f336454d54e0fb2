//! Remote document with a TTL cache.
//!
//! A page moves between three states: never fetched, cached (fetched less
//! than the TTL ago) and stale. Reads of a cached page never touch the
//! network. A save always leaves the page stale so the next read sees what
//! the wiki actually stored.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::client::SiteClient;
use super::edit_form::{EDIT_TIME_FIELD, EDIT_TOKEN_FIELD, EditTokens, START_TIME_FIELD};
use super::error::RemoteResult;

/// Token value sent when the form never carried one (new article).
const MISSING_TIMESTAMP: &str = "0";
/// Summary sent when the document carries no annotation.
const BLANK_SUMMARY: &str = " ";

static SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\[Summary:(.*)\]\]").expect("summary pattern is valid"));

#[derive(Debug, Default)]
struct PageState {
    body: String,
    last_fetch: Option<Instant>,
    tokens: EditTokens,
}

impl PageState {
    fn is_fresh(&self, ttl: std::time::Duration) -> bool {
        self.last_fetch.is_some_and(|fetched| fetched.elapsed() < ttl)
    }
}

/// One wiki document.
#[derive(Debug)]
pub struct Page {
    client: Arc<SiteClient>,
    title: String,
    // Held across the fetch so concurrent stale reads share one round trip.
    state: Mutex<PageState>,
}

impl Page {
    pub fn new(client: Arc<SiteClient>, title: impl Into<String>) -> Self {
        Self {
            client,
            title: title.into(),
            state: Mutex::new(PageState::default()),
        }
    }

    /// Current body, fetched if the cache is stale.
    ///
    /// Transport and parse errors propagate: the document is unavailable.
    pub async fn get(&self) -> RemoteResult<String> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await?;
        Ok(state.body.clone())
    }

    /// Submit a new revision. Best effort: failures are logged, never returned.
    pub async fn set(&self, new_body: &str) {
        let mut state = self.state.lock().await;

        // The save needs current tokens; a failed refresh still attempts it.
        if let Err(e) = self.refresh(&mut state).await {
            tracing::warn!("Could not refresh {} before saving: {}", self.title, e);
        }

        let (summary, body) = split_summary(&state.body, new_body);
        let tokens = &state.tokens;
        let mut form = vec![
            ("wpTextbox1".to_string(), body),
            ("wpSummary".to_string(), summary),
            (
                EDIT_TIME_FIELD.to_string(),
                tokens
                    .edit_time
                    .clone()
                    .unwrap_or_else(|| MISSING_TIMESTAMP.to_string()),
            ),
            (
                START_TIME_FIELD.to_string(),
                tokens
                    .start_time
                    .clone()
                    .unwrap_or_else(|| MISSING_TIMESTAMP.to_string()),
            ),
            ("wpSave".to_string(), "1".to_string()),
        ];
        if let Some(token) = &tokens.edit_token {
            form.push((EDIT_TOKEN_FIELD.to_string(), token.clone()));
        }

        match self.client.submit(&self.title, form).await {
            Ok(response) if response.is_success() => {
                tracing::info!("Page {} updated successfully", self.title);
            }
            Ok(response) => {
                tracing::error!(
                    "Saving {} failed ({}); response body was {}",
                    self.title,
                    response.status,
                    response.body
                );
            }
            Err(e) => {
                tracing::error!("Saving {} failed: {}", self.title, e);
            }
        }

        state.last_fetch = None;
    }

    async fn refresh(&self, state: &mut PageState) -> RemoteResult<()> {
        if state.is_fresh(self.client.cache_ttl()) {
            return Ok(());
        }
        tracing::debug!("Fetching {} from {}", self.title, self.client.site().host);
        let form = self.client.fetch(&self.title).await?;
        state.body = form.body;
        state.tokens = form.tokens;
        state.last_fetch = Some(Instant::now());
        Ok(())
    }
}

/// Pick the edit summary out of `cached` and strip it from `new_body`.
///
/// The last `[[Summary:...]]` annotation of the cached body wins. Without one
/// the summary is blank and the body is sent unchanged.
fn split_summary(cached: &str, new_body: &str) -> (String, String) {
    match SUMMARY.captures_iter(cached).last() {
        Some(caps) => (caps[1].to_string(), new_body.replace(&caps[0], "")),
        None => (BLANK_SUMMARY.to_string(), new_body.to_string()),
    }
}
