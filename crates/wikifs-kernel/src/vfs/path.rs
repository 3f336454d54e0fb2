//! Slash-separated path helpers.

/// Split a path into its parent and leaf.
///
/// The root splits to `("/", ".")` so that it resolves to the root's own
/// `.` entry. Trailing slashes are ignored.
pub fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        _ if trimmed.is_empty() => ("/".to_string(), ".".to_string()),
        None => ("/".to_string(), trimmed.to_string()),
        Some(0) => ("/".to_string(), trimmed[1..].to_string()),
        Some(idx) => {
            let parent = trimmed[..idx].trim_end_matches('/');
            let parent = if parent.is_empty() { "/" } else { parent };
            (parent.to_string(), trimmed[idx + 1..].to_string())
        }
    }
}

/// Non-empty components of a path, in order.
pub fn scan_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
