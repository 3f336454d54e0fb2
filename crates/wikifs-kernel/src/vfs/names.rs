//! File name policy: which names are documents and which may be written.

/// Suffix marking a file as a wiki document.
pub const DEFAULT_SUFFIX: &str = ".mw";

/// Characters MediaWiki does not allow in titles. `#` starts a section
/// anchor, so `Japon#x` would address `Japon` itself.
const FORBIDDEN_TITLE_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}'];

/// Classifies leaf names.
///
/// A document name is `<title><suffix>` with a non-empty title free of
/// `# < > [ ] | { }`. Besides
/// documents, editors need to create backup (`name~`), swap (`.name.swp`) and
/// other hidden files next to the document they edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePolicy {
    suffix: String,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX)
    }
}

impl NamePolicy {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Title of the document behind `name`, if it is one.
    pub fn title<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_suffix(self.suffix.as_str())
            .filter(|title| !title.is_empty() && !title.contains(FORBIDDEN_TITLE_CHARS))
    }

    pub fn is_document(&self, name: &str) -> bool {
        self.title(name).is_some()
    }

    pub fn is_writable(&self, name: &str) -> bool {
        self.is_document(name)
            || name.ends_with('~')
            || name.ends_with(".swp")
            || name.starts_with('.')
    }
}
