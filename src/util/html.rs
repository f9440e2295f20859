//! HTML helpers: escaping, entity decoding, and HTML → plain text.
//!
//! The converter walks quick-xml events in a lenient configuration (end tag
//! names unchecked, unmatched ends allowed), which copes with the tag soup
//! most feeds publish. Input quick-xml cannot tokenize at all falls back to
//! plain tag stripping.

use quick_xml::escape::{partial_escape, resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

use super::text::wrap_line;
use crate::config::FeedOptions;

/// Converts HTML into readable plain text.
pub trait PlainRenderer {
    fn render_plain(&self, html: &str) -> String;
}

/// Escape `<`, `>` and `&` for embedding text in HTML.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    partial_escape(s)
}

/// Decode HTML5 named and numeric entities. Text with unknown entities or
/// stray ampersands is returned unchanged.
pub fn unescape_html(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    match unescape_with(s, resolve_html5_entity) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(s),
    }
}

/// HTML → text converter producing lightly marked-up text.
#[derive(Debug, Clone, Default)]
pub struct HtmlText {
    /// Wrap paragraphs at this many columns. 0 disables wrapping.
    pub body_width: usize,
    /// Keep typographic Unicode instead of folding it to ASCII.
    pub unicode_snob: bool,
    /// Emit link targets as numbered references after each paragraph
    /// instead of inline.
    pub links_after_each_paragraph: bool,
}

impl HtmlText {
    pub fn from_options(options: &FeedOptions) -> Self {
        Self {
            body_width: usize::try_from(options.body_width).unwrap_or(usize::MAX),
            unicode_snob: options.unicode_snob,
            links_after_each_paragraph: options.links_after_each_paragraph,
        }
    }
}

impl PlainRenderer for HtmlText {
    fn render_plain(&self, html: &str) -> String {
        let text = match self.convert(html) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "HTML did not tokenize, stripping tags instead");
                strip_tags(html)
            }
        };
        if self.unicode_snob {
            text
        } else {
            fold_to_ascii(&text)
        }
    }
}

impl HtmlText {
    fn convert(&self, html: &str) -> Result<String, quick_xml::Error> {
        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;

        let mut out = TextBuilder::new(self);
        loop {
            match reader.read_event()? {
                Event::Start(e) => out.open(&e, false),
                Event::Empty(e) => out.open(&e, true),
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    out.close(&name);
                }
                Event::Text(e) => {
                    let raw = String::from_utf8_lossy(&e);
                    out.text(&unescape_html(&raw));
                }
                Event::CData(e) => out.text(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(out.finish())
    }
}

/// Pending hyperlink while its text is being collected.
struct OpenLink {
    href: String,
}

struct TextBuilder<'a> {
    opts: &'a HtmlText,
    out: String,
    block: String,
    pre_depth: usize,
    skip_depth: usize,
    lists: Vec<Option<usize>>,
    links: Vec<OpenLink>,
    references: Vec<String>,
    reference_count: usize,
}

impl<'a> TextBuilder<'a> {
    fn new(opts: &'a HtmlText) -> Self {
        Self {
            opts,
            out: String::new(),
            block: String::new(),
            pre_depth: 0,
            skip_depth: 0,
            lists: Vec::new(),
            links: Vec::new(),
            references: Vec::new(),
            reference_count: 0,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
        if self.skip_depth > 0 {
            if !empty && matches!(name.as_str(), "script" | "style" | "head" | "title") {
                self.skip_depth += 1;
            }
            return;
        }
        match name.as_str() {
            "script" | "style" | "head" | "title" => {
                if !empty {
                    self.skip_depth = 1;
                }
            }
            "p" | "div" | "blockquote" | "table" | "tr" | "section" | "article" => {
                self.end_block()
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.end_block();
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.block.push_str(&"#".repeat(level));
                self.block.push(' ');
            }
            "ul" => {
                self.end_block();
                self.lists.push(None);
            }
            "ol" => {
                self.end_block();
                self.lists.push(Some(0));
            }
            "li" => {
                if !self.block.is_empty() && !self.block.ends_with('\n') {
                    self.block.push('\n');
                }
                let depth = self.lists.len().max(1);
                self.block.push_str(&"  ".repeat(depth));
                match self.lists.last_mut() {
                    Some(Some(n)) => {
                        *n += 1;
                        self.block.push_str(&format!("{}. ", n));
                    }
                    _ => self.block.push_str("* "),
                }
            }
            "br" => self.block.push('\n'),
            "hr" => {
                self.end_block();
                self.block.push_str("* * *");
                self.end_block();
            }
            "pre" => {
                self.end_block();
                self.pre_depth += 1;
            }
            "em" | "i" => self.block.push('_'),
            "strong" | "b" => self.block.push_str("**"),
            "code" if self.pre_depth == 0 => self.block.push('`'),
            "a" => {
                let href = attribute(e, b"href").unwrap_or_default();
                if !empty {
                    if !href.is_empty() {
                        self.block.push('[');
                    }
                    self.links.push(OpenLink { href });
                }
            }
            "img" => {
                let src = attribute(e, b"src").unwrap_or_default();
                if !src.is_empty() {
                    let alt = attribute(e, b"alt").unwrap_or_default();
                    self.block.push_str(&format!("![{}]({})", alt, src));
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        if self.skip_depth > 0 {
            if matches!(name, "script" | "style" | "head" | "title") {
                self.skip_depth -= 1;
            }
            return;
        }
        match name {
            "p" | "div" | "blockquote" | "table" | "tr" | "section" | "article" | "h1" | "h2"
            | "h3" | "h4" | "h5" | "h6" => self.end_block(),
            "ul" | "ol" => {
                self.lists.pop();
                self.end_block();
            }
            "pre" => {
                self.end_block();
                self.pre_depth = self.pre_depth.saturating_sub(1);
            }
            "em" | "i" => self.block.push('_'),
            "strong" | "b" => self.block.push_str("**"),
            "code" if self.pre_depth == 0 => self.block.push('`'),
            "a" => {
                if let Some(link) = self.links.pop() {
                    if link.href.is_empty() {
                        return;
                    }
                    if self.opts.links_after_each_paragraph {
                        self.reference_count += 1;
                        self.block.push_str(&format!("][{}]", self.reference_count));
                        self.references
                            .push(format!("   [{}]: {}", self.reference_count, link.href));
                    } else {
                        self.block.push_str(&format!("]({})", link.href));
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            return;
        }
        if self.pre_depth > 0 {
            self.block.push_str(text);
            return;
        }
        let mut pending_space = text.starts_with(char::is_whitespace);
        for word in text.split_whitespace() {
            let at_line_start = self.block.is_empty() || self.block.ends_with('\n');
            if pending_space && !at_line_start && !self.block.ends_with(' ') {
                self.block.push(' ');
            }
            self.block.push_str(word);
            pending_space = true;
        }
        if text.ends_with(char::is_whitespace)
            && !self.block.is_empty()
            && !self.block.ends_with(char::is_whitespace)
        {
            self.block.push(' ');
        }
    }

    fn end_block(&mut self) {
        let block = std::mem::take(&mut self.block);
        let block = if self.pre_depth > 0 {
            block.trim_matches('\n').to_string()
        } else {
            let lines: Vec<String> = block
                .lines()
                .map(str::trim_end)
                .flat_map(|line| wrap_line(line, self.opts.body_width))
                .collect();
            lines
                .join("\n")
                .trim_start_matches('\n')
                .trim_end()
                .to_string()
        };
        if !block.is_empty() {
            if !self.out.is_empty() {
                self.out.push_str("\n\n");
            }
            self.out.push_str(&block);
        }
        if !self.references.is_empty() {
            self.out.push_str("\n\n");
            self.out.push_str(&self.references.join("\n"));
            self.references.clear();
        }
    }

    fn finish(mut self) -> String {
        self.end_block();
        let mut out = self.out;
        out.push('\n');
        out
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(key))
        .map(|a| unescape_html(&String::from_utf8_lossy(&a.value)).into_owned())
}

/// Last-resort conversion: drop anything between `<` and `>`.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    let text = unescape_html(&out).into_owned();
    let mut result = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    result.push('\n');
    result
}

/// Replace common typographic characters with ASCII look-alikes.
fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{a0}' => out.push(' '),
            '\u{2018}' | '\u{2019}' | '\u{201a}' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' => out.push('"'),
            '\u{2013}' => out.push('-'),
            '\u{2014}' => out.push_str("--"),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' | '\u{b7}' => out.push('*'),
            '\u{2192}' => out.push_str("->"),
            '\u{2190}' => out.push_str("<-"),
            '\u{a9}' => out.push_str("(C)"),
            '\u{e6}' => out.push_str("ae"),
            '\u{153}' => out.push_str("oe"),
            _ => out.push(c),
        }
    }
    out
}
