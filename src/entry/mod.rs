//! Per-entry pipeline: identity, content selection, rendering, sender and
//! header synthesis.

mod content;
mod headers;
mod identity;
mod render;
mod sender;

use chrono::{DateTime, Utc};

pub use content::{entry_title, select};
pub use headers::{build as build_headers, entry_tags, header_date, USER_AGENT};
pub use identity::{fingerprint, resolve_guid, resolve_id};
pub use render::render;
pub use sender::{format_address, resolve_address, resolve_email, resolve_name, validate_email};

use crate::config::Feed;
use crate::feed::{Entry, ParsedFeed};
use crate::mail::{BodyType, Message};
use crate::util::PlainRenderer;

/// Compose the mail for one new entry of `feed`.
pub fn compose<R: PlainRenderer + ?Sized>(
    feed: &Feed,
    parsed: &ParsedFeed,
    entry: &Entry,
    id: Option<&str>,
    renderer: &R,
    now: DateTime<Utc>,
) -> Message {
    let options = &feed.options;
    let sender = resolve_email(parsed, entry, options);
    let link = entry.link.as_deref();
    let subject = entry_title(entry, options.html_mail, renderer);
    let headers = build_headers(entry, id, link, &feed.url, options, now);

    let selected = select(entry, options.html_mail);
    let body = render(entry, &selected, link, &subject, options, renderer);

    Message {
        sender,
        recipient: options.to.clone(),
        subject,
        body: body.value,
        content_type: BodyType::from_mime(&body.content_type),
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedOptions;
    use crate::feed::{Content, FeedMeta, Person};
    use crate::util::HtmlText;
    use chrono::TimeZone;

    #[test]
    fn test_compose_plain_message() {
        let options = FeedOptions {
            to: "me@example.com".into(),
            ..FeedOptions::default()
        };
        let feed = Feed::new("blog", "https://example.com/feed", options).unwrap();
        let parsed = ParsedFeed {
            feed: FeedMeta {
                title: Some("Blog".into()),
                author_detail: Some(Person {
                    name: None,
                    email: Some("author@example.com".into()),
                }),
                ..FeedMeta::default()
            },
            ..ParsedFeed::default()
        };
        let entry = Entry {
            id: Some("urn:1".into()),
            title: Some("First post".into()),
            link: Some("https://example.com/1".into()),
            content: vec![Content::new("text/html", "<p>Hello <b>world</b></p>")],
            ..Entry::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let message = compose(&feed, &parsed, &entry, Some("urn:1"), &HtmlText::default(), now);
        assert_eq!(message.sender, "Blog <author@example.com>");
        assert_eq!(message.recipient, "me@example.com");
        assert_eq!(message.subject, "First post");
        assert_eq!(message.content_type, BodyType::Plain);
        assert_eq!(
            message.body,
            "Hello **world**\n\n\nURL: https://example.com/1"
        );
        assert_eq!(message.headers.get("X-RSS-ID"), Some("urn:1"));
        assert_eq!(
            message.headers.get("X-RSS-Feed"),
            Some("https://example.com/feed")
        );
    }

    #[test]
    fn test_compose_rss_author_builds_valid_mail() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Blog</title>
  <item>
    <guid>urn:a</guid>
    <title>Hello</title>
    <author>jane@example.com (Jane Doe)</author>
    <description>Body</description>
  </item>
</channel></rss>"#;
        let doc = crate::feed::parse_feed(rss.as_bytes()).unwrap();
        let parsed = ParsedFeed {
            status: 200,
            version: doc.version,
            entries: doc.entries,
            feed: doc.feed,
            ..ParsedFeed::default()
        };
        let options = FeedOptions {
            to: "me@example.com".into(),
            ..FeedOptions::default()
        };
        let feed = Feed::new("blog", "https://example.com/feed", options).unwrap();

        let message = compose(
            &feed,
            &parsed,
            &parsed.entries[0],
            Some("urn:a"),
            &HtmlText::default(),
            Utc::now(),
        );
        assert_eq!(message.sender, "\"Blog: Jane Doe\" <jane@example.com>");
        assert!(message.to_lettre().is_ok());
    }

    #[test]
    fn test_compose_html_message() {
        let options = FeedOptions {
            to: "me@example.com".into(),
            html_mail: true,
            ..FeedOptions::default()
        };
        let feed = Feed::new("blog", "https://example.com/feed", options).unwrap();
        let entry = Entry {
            title: Some("Post".into()),
            content: vec![Content::new("text/html", "<p>x</p>")],
            ..Entry::default()
        };
        let message = compose(
            &feed,
            &ParsedFeed::default(),
            &entry,
            None,
            &HtmlText::default(),
            Utc::now(),
        );
        assert_eq!(message.content_type, BodyType::Html);
        assert!(message.body.contains("<p>x</p>"));
        assert!(message.headers.get("X-RSS-ID").is_none());
    }
}
