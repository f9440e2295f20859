//! Content variant selection and subject extraction.

use crate::feed::{Content, Entry, TEXT_HTML, TEXT_PLAIN};
use crate::util::{take_chars, PlainRenderer};

/// Subjects taken from the body are cut to this many characters.
const SUBJECT_FROM_BODY_CHARS: usize = 70;

/// Pick the best content variant of an entry.
///
/// Candidates are the entry's `content` list followed by its summary. Each
/// preferred type is looked for across *all* candidates before moving on to
/// the next type, so a later HTML variant beats an earlier plain one when
/// HTML is preferred. With no match the first candidate wins; with no
/// candidates the result is empty plain text.
pub fn select(entry: &Entry, prefer_html: bool) -> Content {
    let candidates: Vec<&Content> = entry
        .content
        .iter()
        .chain(entry.summary_detail.as_ref())
        .collect();

    let preferences = if prefer_html {
        [TEXT_HTML, TEXT_PLAIN]
    } else {
        [TEXT_PLAIN, TEXT_HTML]
    };

    preferences
        .iter()
        .find_map(|wanted| {
            candidates
                .iter()
                .find(|c| c.content_type == *wanted)
                .copied()
        })
        .or_else(|| candidates.first().copied())
        .cloned()
        .unwrap_or_else(Content::empty)
}

/// Subject line for an entry.
///
/// Uses the title (converted to text when it is HTML), else the start of the
/// selected content. Newlines become spaces.
pub fn entry_title<R: PlainRenderer + ?Sized>(
    entry: &Entry,
    prefer_html: bool,
    renderer: &R,
) -> String {
    let title = match &entry.title_detail {
        Some(detail) if detail.content_type.contains("html") => {
            renderer.render_plain(&detail.value)
        }
        Some(detail) => detail.value.clone(),
        None => match &entry.title {
            Some(title) => title.clone(),
            None => {
                let content = select(entry, prefer_html);
                take_chars(&content.value, SUBJECT_FROM_BODY_CHARS).to_string()
            }
        },
    };
    title.replace('\n', " ").trim().to_string()
}
