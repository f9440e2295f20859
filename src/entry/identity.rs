//! Stable per-entry identifiers.
//!
//! The id says "what this entry looks like now"; the guid says "which entry
//! this is". With `trust-guid` they coincide. Without it the id is a content
//! fingerprint, so an edited entry gets a new id under the same guid and is
//! delivered again.

use sha2::{Digest, Sha256};

use super::content::select;
use crate::feed::Entry;

/// Lowercase hex SHA-256 of `input`. Stable across processes and platforms.
pub fn fingerprint(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Derive the id used to detect changes to an entry.
///
/// Returns `None` only when the entry has no native id (or it is not
/// trusted) and no content, link, or title to fingerprint.
pub fn resolve_id(entry: &Entry, trust_guid: bool, prefer_html: bool) -> Option<String> {
    if trust_guid {
        if let Some(id) = entry.native_id() {
            return Some(id.to_string());
        }
    }

    let content = select(entry, prefer_html);
    let value = content.value.trim();
    if !value.is_empty() {
        return Some(fingerprint(value));
    }
    if let Some(link) = entry.link.as_deref().filter(|l| !l.is_empty()) {
        return Some(fingerprint(link));
    }
    entry
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(fingerprint)
}

/// Dedup key: the native id when present, else the derived id.
pub fn resolve_guid(entry: &Entry, id: Option<&str>) -> Option<String> {
    entry.native_id().or(id).map(str::to_string)
}
