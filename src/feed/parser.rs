use feed_rs::model::{self, FeedType};
use feed_rs::parser;

use super::model::{Content, Enclosure, Entry, FeedMeta, Link, ParseIssue, Person, Tag};

/// The document part of a fetch result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub version: Option<String>,
    pub entries: Vec<Entry>,
    pub feed: FeedMeta,
}

/// Parse an RSS, Atom, or JSON Feed document.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedDocument, ParseIssue> {
    let feed = parser::parse(bytes).map_err(|e| ParseIssue::Xml(e.to_string()))?;

    let version = feed_version(&feed.feed_type);
    let contributor = |role: &str| {
        feed.contributors
            .iter()
            .find(|p| p.name == role && p.uri.is_none())
            .map(person)
    };
    let meta = FeedMeta {
        title: feed.title.as_ref().map(|t| t.content.clone()),
        author_detail: feed
            .authors
            .first()
            .map(person)
            .or_else(|| contributor("managingEditor")),
        publisher_detail: contributor("webMaster"),
        // feed-rs does not expose admin:errorReportsTo
        errorreportsto: None,
    };
    let entries = feed.entries.into_iter().map(entry).collect();

    Ok(ParsedDocument {
        version: Some(version.to_string()),
        entries,
        feed: meta,
    })
}

fn feed_version(feed_type: &FeedType) -> &'static str {
    match feed_type {
        FeedType::Atom => "atom10",
        FeedType::JSON => "json1",
        FeedType::RSS0 => "rss",
        FeedType::RSS1 => "rss10",
        FeedType::RSS2 => "rss20",
    }
}

fn text(t: &model::Text) -> Content {
    Content::new(t.content_type.essence().to_string(), t.content.clone())
}

/// RSS contact elements. feed-rs reports them as a person named after the
/// element with the raw element text as the email.
const CONTACT_ROLES: &[&str] = &["author", "managingEditor", "webMaster"];

fn person(p: &model::Person) -> Person {
    if CONTACT_ROLES.contains(&p.name.as_str()) && p.uri.is_none() {
        if let Some(contact) = &p.email {
            return parse_contact(contact);
        }
    }
    Person {
        name: non_empty(&p.name),
        email: p.email.as_deref().and_then(non_empty),
    }
}

fn non_empty(s: &str) -> Option<String> {
    Some(s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Split RSS contact text: `addr (Name)`, `Name <addr>`, a bare address,
/// or a bare name.
fn parse_contact(text: &str) -> Person {
    let text = text.trim();
    if let Some((addr, rest)) = text.split_once('(') {
        if let Some(name) = rest.strip_suffix(')') {
            return Person {
                name: non_empty(name),
                email: non_empty(addr),
            };
        }
    }
    if let Some((name, rest)) = text.split_once('<') {
        if let Some(addr) = rest.strip_suffix('>') {
            return Person {
                name: non_empty(name.trim().trim_matches('"')),
                email: non_empty(addr),
            };
        }
    }
    if text.contains('@') {
        Person {
            name: None,
            email: non_empty(text),
        }
    } else {
        Person {
            name: non_empty(text),
            email: None,
        }
    }
}

fn entry(e: model::Entry) -> Entry {
    let links: Vec<Link> = e
        .links
        .iter()
        .map(|l| Link {
            rel: l.rel.clone(),
            href: l.href.clone(),
            title: l.title.clone(),
        })
        .collect();

    let link = e
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| e.links.first())
        .map(|l| l.href.clone());

    let mut enclosures: Vec<Enclosure> = e
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| Enclosure {
            url: Some(l.href.clone()),
            src: None,
        })
        .collect();
    for media in &e.media {
        for content in &media.content {
            if let Some(url) = &content.url {
                let url = url.to_string();
                if !enclosures.iter().any(|en| en.url.as_deref() == Some(url.as_str())) {
                    enclosures.push(Enclosure {
                        url: Some(url),
                        src: None,
                    });
                }
            }
        }
    }

    let content = e
        .content
        .as_ref()
        .and_then(|c| {
            c.body
                .as_ref()
                .map(|body| Content::new(c.content_type.essence().to_string(), body.clone()))
        })
        .into_iter()
        .collect();

    Entry {
        id: Some(e.id.trim().to_string()).filter(|id| !id.is_empty()),
        title: e.title.as_ref().map(|t| t.content.clone()),
        title_detail: e.title.as_ref().map(text),
        content,
        summary_detail: e.summary.as_ref().map(text),
        link,
        links,
        enclosures,
        tags: e
            .categories
            .iter()
            .map(|c| Tag {
                term: Some(c.term.clone()),
            })
            .collect(),
        author_detail: e.authors.first().map(person),
        published: e.published,
        updated: e.updated,
        created: None,
        expired: None,
    }
}
