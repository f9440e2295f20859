//! Final message body construction.

use crate::config::FeedOptions;
use crate::feed::{Content, Entry, TEXT_HTML, TEXT_PLAIN};
use crate::util::{escape_html, PlainRenderer};

const READER_PUBLIC_PREFIX: &str = "http://www.google.com/reader/public/atom/";
const READER_VIEW_PREFIX: &str = "http://www.google.com/reader/view/";

/// `rel="via"` links as (url, label) pairs.
fn via_links(entry: &Entry) -> impl Iterator<Item = (String, String)> + '_ {
    entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("via"))
        .map(|l| {
            let url = l.href.replace(READER_PUBLIC_PREFIX, READER_VIEW_PREFIX);
            let label = l
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| url.clone());
            (url, label)
        })
}

/// Build the body of the mail for `entry`.
///
/// `content` is the variant picked by [`super::select`]. The result is
/// `text/html` when `html-mail` is on, `text/plain` otherwise.
pub fn render<R: PlainRenderer + ?Sized>(
    entry: &Entry,
    content: &Content,
    link: Option<&str>,
    subject: &str,
    options: &FeedOptions,
    renderer: &R,
) -> Content {
    if options.html_mail {
        Content::new(TEXT_HTML, render_html(entry, content, link, subject, options))
    } else {
        Content::new(TEXT_PLAIN, render_text(entry, content, link, renderer))
    }
}

fn render_html(
    entry: &Entry,
    content: &Content,
    link: Option<&str>,
    subject: &str,
    options: &FeedOptions,
) -> String {
    let link = escape_html(link.unwrap_or_default());
    let mut lines: Vec<String> = vec![
        "<!DOCTYPE html>".into(),
        "<html>".into(),
        "  <head>".into(),
    ];
    if options.use_css && !options.css.is_empty() {
        lines.push(r#"    <style type="text/css">"#.into());
        lines.push(options.css.clone());
        lines.push("    </style>".into());
    }
    lines.extend([
        "  </head>".into(),
        "<body>".into(),
        r#"<div id="entry">"#.into(),
        format!(
            r#"<h1 class="header"><a href="{}">{}</a></h1>"#,
            link,
            escape_html(subject)
        ),
        r#"<div id="body"><table><tr><td>"#.into(),
    ]);

    let body = content.value.trim();
    if content.is_html() {
        lines.push(body.to_string());
    } else {
        lines.push(escape_html(body).into_owned());
    }
    lines.push("</td></tr></table></div>".into());

    lines.push(format!(
        r#"<div class="footer"><p>URL: <a href="{0}">{0}</a></p>"#,
        link
    ));
    for enclosure in &entry.enclosures {
        if let Some(url) = enclosure.url.as_deref().filter(|u| !u.is_empty()) {
            lines.push(format!(
                r#"<p>Enclosure: <a href="{0}">{0}</a></p>"#,
                escape_html(url)
            ));
        }
        if let Some(src) = enclosure.src.as_deref().filter(|s| !s.is_empty()) {
            let src = escape_html(src);
            lines.push(format!(r#"<p>Enclosure: <a href="{0}">{0}</a></p>"#, src));
            lines.push(format!(r#"<p><img src="{}" /></p>"#, src));
        }
    }
    for (url, label) in via_links(entry) {
        lines.push(format!(
            r#"<p>Via <a href="{}">{}</a></p>"#,
            escape_html(&url),
            escape_html(&label)
        ));
    }
    lines.extend([
        "</div>".into(),
        "</div>".into(),
        "</body>".into(),
        "</html>".into(),
        String::new(),
    ]);
    lines.join("\n")
}

fn render_text<R: PlainRenderer + ?Sized>(
    entry: &Entry,
    content: &Content,
    link: Option<&str>,
    renderer: &R,
) -> String {
    let mut lines = Vec::new();
    if content.is_html() {
        lines.push(renderer.render_plain(&content.value));
    } else {
        lines.push(content.value.clone());
    }
    lines.push(String::new());
    lines.push(format!("URL: {}", link.unwrap_or_default()));
    for enclosure in &entry.enclosures {
        for target in [&enclosure.url, &enclosure.src].into_iter().flatten() {
            if !target.is_empty() {
                lines.push(format!("Enclosure: {}", target));
            }
        }
    }
    for (url, label) in via_links(entry) {
        lines.push(format!("Via: {} {}", label, url));
    }
    lines.join("\n")
}
