//! Edit-form scanner.
//!
//! The edit view of a document is an HTML page holding the raw source in a
//! `<textarea>` and the optimistic-concurrency tokens in hidden `<input>`
//! elements. The page is scanned as a stream of markup events: text is
//! captured strictly between a textarea's open and close events, and an input
//! whose `name` is exactly one of the token names records its `value`
//! (last value wins).

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;

use super::error::{RemoteError, RemoteResult};

/// Name of the hidden input carrying the revision timestamp.
pub const EDIT_TIME_FIELD: &str = "wpEdittime";
/// Name of the hidden input carrying the edit-session start timestamp.
pub const START_TIME_FIELD: &str = "wpStarttime";
/// Name of the hidden input carrying the CSRF edit token.
pub const EDIT_TOKEN_FIELD: &str = "wpEditToken";

const TEXTAREA: &[u8] = b"textarea";
const INPUT: &[u8] = b"input";

/// Tokens scraped from one fetch of the edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditTokens {
    pub edit_time: Option<String>,
    pub start_time: Option<String>,
    pub edit_token: Option<String>,
}

/// Result of scanning an edit view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditForm {
    /// Document source, whitespace-trimmed.
    pub body: String,
    pub tokens: EditTokens,
}

#[derive(Default)]
struct Scanner {
    in_textarea: bool,
    captured: Option<String>,
    tokens: EditTokens,
}

impl Scanner {
    fn open(&mut self, tag: &BytesStart<'_>) {
        let name = tag.name();
        if name.as_ref().eq_ignore_ascii_case(TEXTAREA) {
            self.captured = Some(String::new());
            self.in_textarea = true;
        } else if name.as_ref().eq_ignore_ascii_case(INPUT) {
            self.record_input(tag);
        }
    }

    fn close(&mut self, name: &[u8]) {
        if name.eq_ignore_ascii_case(TEXTAREA) {
            self.in_textarea = false;
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_textarea {
            if let Some(captured) = self.captured.as_mut() {
                captured.push_str(text);
            }
        }
    }

    fn record_input(&mut self, tag: &BytesStart<'_>) {
        let mut name = None;
        let mut value = None;
        for attr in tag.html_attributes().flatten() {
            let key = attr.key.as_ref();
            let text = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            if key.eq_ignore_ascii_case(b"name") {
                name = Some(text);
            } else if key.eq_ignore_ascii_case(b"value") {
                value = Some(text);
            }
        }

        let slot = match name.as_deref() {
            Some(EDIT_TIME_FIELD) => &mut self.tokens.edit_time,
            Some(START_TIME_FIELD) => &mut self.tokens.start_time,
            Some(EDIT_TOKEN_FIELD) => &mut self.tokens.edit_token,
            _ => return,
        };
        *slot = Some(value.unwrap_or_default());
    }

    fn finish(self) -> EditForm {
        EditForm {
            body: self.captured.unwrap_or_default().trim().to_string(),
            tokens: self.tokens,
        }
    }
}

fn decode_text(text: &BytesText<'_>) -> String {
    // Unknown HTML entities (`&nbsp;`) are kept verbatim.
    text.unescape()
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(text).into_owned())
}

/// Scan an edit view into its document source and tokens.
pub fn scan_edit_form(html: &str) -> RemoteResult<EditForm> {
    let mut reader = Reader::from_str(html);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;
    }

    let mut scanner = Scanner::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => scanner.open(&tag),
            Ok(Event::Empty(tag)) => {
                scanner.open(&tag);
                scanner.close(tag.name().as_ref());
            }
            Ok(Event::End(tag)) => scanner.close(tag.name().as_ref()),
            Ok(Event::Text(text)) => scanner.text(&decode_text(&text)),
            Ok(Event::CData(data)) => scanner.text(&String::from_utf8_lossy(&data)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(RemoteError::parse(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    Ok(scanner.finish())
}
