//! Extra header synthesis: Date, Message-ID, feed metadata, bonus headers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{DateKind, FeedOptions};
use crate::feed::Entry;
use crate::mail::Headers;

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S -0000";
const MESSAGE_ID_DOMAIN: &str = "dev.null.invalid";

pub const USER_AGENT: &str = concat!("feedmail/", env!("CARGO_PKG_VERSION"));

fn entry_date(entry: &Entry, kind: DateKind) -> Option<DateTime<Utc>> {
    match kind {
        DateKind::Updated => entry.updated,
        DateKind::Published => entry.published,
        DateKind::Created => entry.created,
        DateKind::Expired => entry.expired,
    }
}

/// Date for the `Date` header: the first configured entry timestamp when
/// `date-header` is on, else `now`.
pub fn header_date(entry: &Entry, options: &FeedOptions, now: DateTime<Utc>) -> String {
    let date = if options.date_header {
        options
            .date_header_order
            .iter()
            .find_map(|kind| entry_date(entry, *kind))
            .unwrap_or(now)
    } else {
        now
    };
    date.format(DATE_FORMAT).to_string()
}

/// Comma-joined non-empty tag terms.
pub fn entry_tags(entry: &Entry) -> Option<String> {
    let tags: Vec<&str> = entry
        .tags
        .iter()
        .filter_map(|t| t.term.as_deref())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

/// Build the extra headers for one entry.
pub fn build(
    entry: &Entry,
    id: Option<&str>,
    link: Option<&str>,
    feed_url: &str,
    options: &FeedOptions,
    now: DateTime<Utc>,
) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Date", header_date(entry, options, now));
    headers.insert(
        "Message-ID",
        format!("<{}@{}>", Uuid::new_v4(), MESSAGE_ID_DOMAIN),
    );
    headers.insert("User-Agent", USER_AGENT);
    headers.insert("X-RSS-Feed", feed_url);
    headers.insert_opt("X-RSS-ID", id);
    headers.insert_opt("X-RSS-URL", link);
    headers.insert_opt("X-RSS-TAGS", entry_tags(entry));

    for line in options.bonus_header.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => headers.insert(key.trim(), value.trim()),
            None => tracing::warn!(header = %line, "Malformed bonus-header line, skipping"),
        }
    }
    headers
}
