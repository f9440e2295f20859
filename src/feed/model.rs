//! In-memory shape of one fetch: the parsed feed, its entries, and the
//! transport/parse diagnostics that came with it.
//!
//! These types live only for the duration of a single run and are never
//! persisted. They derive `Deserialize` so fixtures can be written as JSON,
//! which is also where legacy identifier shapes are normalized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const TEXT_HTML: &str = "text/html";
pub const TEXT_PLAIN: &str = "text/plain";
pub const XHTML: &str = "application/xhtml+xml";

/// A content variant of an entry (body, summary, or title).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

impl Content {
    pub fn new(content_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            value: value.into(),
        }
    }

    /// Empty plain-text content, used when an entry carries nothing at all.
    pub fn empty() -> Self {
        Self::new(TEXT_PLAIN, "")
    }

    /// True for `text/html` and `application/xhtml+xml`.
    pub fn is_html(&self) -> bool {
        self.content_type == TEXT_HTML || self.content_type == XHTML
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    pub href: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub term: Option<String>,
}

/// Author or publisher details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One syndicated item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    /// Native identifier. Older parsers emitted `{"value": "..."}` here;
    /// that form is unwrapped during deserialization.
    #[serde(deserialize_with = "deserialize_entry_id")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub title_detail: Option<Content>,
    pub content: Vec<Content>,
    pub summary_detail: Option<Content>,
    pub link: Option<String>,
    pub links: Vec<Link>,
    pub enclosures: Vec<Enclosure>,
    pub tags: Vec<Tag>,
    pub author_detail: Option<Person>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub expired: Option<DateTime<Utc>>,
}

impl Entry {
    /// Native identifier, ignoring blank values.
    pub fn native_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Feed-level metadata used for sender synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedMeta {
    pub title: Option<String>,
    pub author_detail: Option<Person>,
    pub publisher_detail: Option<Person>,
    pub errorreportsto: Option<String>,
}

/// Non-fatal problem reported by the fetch/parse layer.
///
/// `Interrupted` is the exception: it means the caller asked to stop and is
/// always turned back into a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ParseIssue {
    SocketTimeout,
    Socket(String),
    Url(String),
    Compression,
    Io(String),
    Xml(String),
    Other(String),
    Interrupted,
}

/// Result of fetching and parsing a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedFeed {
    pub status: u16,
    /// Final URL after redirects.
    pub url: Option<String>,
    /// HTTP response headers with lower-cased names. `None` when the
    /// transport never produced a response.
    pub headers: Option<HashMap<String, String>>,
    pub bozo: bool,
    pub bozo_exception: Option<ParseIssue>,
    /// Detected dialect, e.g. `rss20` or `atom10`.
    pub version: Option<String>,
    pub etag: Option<String>,
    pub modified: Option<String>,
    /// Entries in feed order (newest first for most publishers).
    pub entries: Vec<Entry>,
    pub feed: FeedMeta,
}

impl Default for ParsedFeed {
    fn default() -> Self {
        Self {
            status: 200,
            url: None,
            headers: None,
            bozo: false,
            bozo_exception: None,
            version: None,
            etag: None,
            modified: None,
            entries: Vec::new(),
            feed: FeedMeta::default(),
        }
    }
}

impl ParsedFeed {
    /// A result that carries only a transport/parse issue.
    pub fn from_issue(issue: ParseIssue) -> Self {
        Self {
            bozo: true,
            bozo_exception: Some(issue),
            ..Self::default()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|h| h.get(&name.to_ascii_lowercase()))
            .map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntryId {
    Text(String),
    Map(BTreeMap<String, String>),
}

fn deserialize_entry_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawEntryId>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawEntryId::Text(id)) => Some(id),
        Some(RawEntryId::Map(map)) => map.into_values().next(),
        None => None,
    })
}
