//! Blocked-content predicate
//!
//! This is the hot path of every scan pass. Side-effect-free: given an
//! element and the current config, decide whether it mentions, was authored
//! by, or links to a blocked username.
//!
//! Two independent checks, either of which blocks:
//!
//! - Text: the subtree's concatenated text, lowercased. Exact mode requires
//!   `@name` at a word boundary; fuzzy mode is plain substring containment
//!   of the bare name (false positives on common words are an accepted
//!   trade-off, not a bug to fix here).
//! - Links: the first path segment of every `a[href]` descendant, compared
//!   for exact equality after normalization. Identity via URL is exact by
//!   construction, so fuzzy mode never applies to links.

use fm_dom::{Document, NodeId};

use crate::config::{normalize_username, FilterConfig};

/// Decide whether `node` should be hidden under `config`.
pub fn is_blocked(doc: &Document, node: NodeId, config: &FilterConfig) -> bool {
    if !config.enabled || config.blocklist.is_empty() {
        return false;
    }

    let text = doc.text_content(node).to_lowercase();
    for name in &config.blocklist {
        if text_matches(&text, name, config.fuzzy_match) {
            return true;
        }
    }

    for href in doc.link_targets(node) {
        if let Some(segment) = profile_segment(href) {
            let candidate = normalize_username(segment);
            if config.blocklist.iter().any(|name| *name == candidate) {
                return true;
            }
        }
    }

    false
}

/// Text check for a single normalized name. `text` must already be
/// lowercased.
pub fn text_matches(text: &str, name: &str, fuzzy: bool) -> bool {
    if name.is_empty() {
        return false;
    }
    if fuzzy {
        // Substring containment; also covers the `@name` form.
        return text.contains(name);
    }
    exact_mention(text, name)
}

/// `@name` preceded by start-of-string or a non-word character and not
/// followed by a word character or `.` — the `.` guards against a name
/// matching as a prefix of `@name.other`.
fn exact_mention(text: &str, name: &str) -> bool {
    let bytes = text.as_bytes();
    let name_bytes = name.as_bytes();
    let mut from = 0;

    while let Some(offset) = text[from..].find('@') {
        let at = from + offset;
        from = at + 1;

        let end = at + 1 + name_bytes.len();
        if end > bytes.len() || &bytes[at + 1..end] != name_bytes {
            continue;
        }
        if at > 0 && is_word_byte(bytes[at - 1]) {
            continue;
        }
        if end < bytes.len() {
            let next = bytes[end];
            if is_word_byte(next) || next == b'.' {
                continue;
            }
        }
        return true;
    }

    false
}

/// Word characters per the mention boundary rule: ASCII alphanumerics and
/// `_`. Non-ASCII bytes count as boundaries.
#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extract the username segment of a profile link: the first path segment of
/// an absolute `http(s)` URL or of a root-relative path.
pub fn profile_segment(href: &str) -> Option<&str> {
    let path = if let Some(rest) = strip_http_scheme(href) {
        let slash = rest.find('/')?;
        &rest[slash + 1..]
    } else if let Some(rest) = href.strip_prefix('/') {
        // "//host/..." is protocol-relative, not a root-relative path.
        if rest.starts_with('/') {
            return None;
        }
        rest
    } else {
        return None;
    };

    let end = path
        .find(|c| c == '/' || c == '?' || c == '#')
        .unwrap_or(path.len());
    let segment = &path[..end];
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

fn strip_http_scheme(href: &str) -> Option<&str> {
    let bytes = href.as_bytes();
    if bytes.len() >= 8 && bytes[..8].eq_ignore_ascii_case(b"https://") {
        Some(&href[8..])
    } else if bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"http://") {
        Some(&href[7..])
    } else {
        None
    }
}
