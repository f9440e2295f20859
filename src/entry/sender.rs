//! From-header synthesis.

use crate::config::FeedOptions;
use crate::feed::{Entry, ParsedFeed, Person};
use crate::util::unescape_html;

/// Return `candidate` if it looks like `local@domain`, else `default`.
///
/// This is a shape check only: exactly one `@` with text on both sides.
pub fn validate_email<'a>(candidate: &'a str, default: &'a str) -> &'a str {
    match candidate.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            candidate
        }
        _ => default,
    }
}

/// [`validate_email`], then reject what the mail layer cannot parse either
/// (`john doe@example.com` has the right shape but is not an address).
fn checked_email<'a>(candidate: &'a str, default: &'a str) -> &'a str {
    let email = validate_email(candidate.trim(), default);
    if email != default && email.parse::<lettre::Address>().is_err() {
        tracing::warn!(address = %email, fallback = %default, "Unusable sender address, using default");
        return default;
    }
    email
}

fn person_name(person: Option<&Person>) -> Option<&str> {
    person
        .and_then(|p| p.name.as_deref())
        .filter(|n| !n.is_empty())
}

fn person_email(person: Option<&Person>) -> Option<&str> {
    person.and_then(|p| p.email.as_deref())
}

/// Display name for the From header.
pub fn resolve_name(
    parsed: &ParsedFeed,
    entry: &Entry,
    friendly_name: bool,
    use_publisher_email: bool,
) -> String {
    if !friendly_name {
        return String::new();
    }

    let feed = &parsed.feed;
    let mut name = feed.title.clone().unwrap_or_default();
    let author = person_name(entry.author_detail.as_ref())
        .or_else(|| person_name(feed.author_detail.as_ref()));
    if let Some(author) = author {
        if !name.is_empty() {
            name.push_str(": ");
        }
        name.push_str(author);
    }
    if name.is_empty() && use_publisher_email {
        if let Some(publisher) = feed.publisher_detail.as_ref().and_then(|p| p.name.as_deref()) {
            name.push_str(publisher);
        }
    }
    unescape_html(&name).into_owned()
}

/// Bare sender address.
///
/// The first address source present wins, even when it then fails
/// validation and falls back to `from_default`.
pub fn resolve_address<'a>(
    parsed: &'a ParsedFeed,
    entry: &'a Entry,
    force_from: bool,
    from_default: &'a str,
    use_publisher_email: bool,
) -> &'a str {
    if force_from {
        return from_default;
    }
    let feed = &parsed.feed;
    if let Some(email) = person_email(entry.author_detail.as_ref()) {
        return checked_email(email, from_default);
    }
    if let Some(email) = person_email(feed.author_detail.as_ref()) {
        return checked_email(email, from_default);
    }
    if use_publisher_email {
        if let Some(email) = person_email(feed.publisher_detail.as_ref()) {
            return checked_email(email, from_default);
        }
        if let Some(email) = feed.errorreportsto.as_deref().filter(|e| !e.is_empty()) {
            return checked_email(email, from_default);
        }
    }
    tracing::debug!("no sender address found, falling back to default");
    from_default
}

/// Full RFC 2822 mailbox for the From header.
pub fn resolve_email(parsed: &ParsedFeed, entry: &Entry, options: &FeedOptions) -> String {
    let name = resolve_name(
        parsed,
        entry,
        options.friendly_name,
        options.use_publisher_email,
    );
    let address = resolve_address(
        parsed,
        entry,
        options.force_from,
        &options.from,
        options.use_publisher_email,
    );
    format_address(&name, address)
}

/// Characters that force a display name to be quoted.
const SPECIALS: &[char] = &[
    '(', ')', '<', '>', '@', ',', ':', ';', '.', '"', '[', ']', '\\',
];

/// Format `name <address>`, quoting the name when needed. An empty name
/// yields the bare address.
pub fn format_address(name: &str, address: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return address.to_string();
    }
    if name.contains(SPECIALS) {
        let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\" <{}>", quoted, address)
    } else {
        format!("{} <{}>", name, address)
    }
}
