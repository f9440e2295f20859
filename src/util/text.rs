use std::borrow::Cow;

use unicode_width::UnicodeWidthStr;

/// Calculates the display width of a string in columns.
///
/// CJK characters and most emoji count as two columns, combining marks as
/// zero.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Word-wrap a single line to at most `width` display columns.
///
/// Leading indentation is kept on the first line and repeated on the
/// continuation lines. Words longer than `width` are not split. A width of
/// 0 disables wrapping.
///
/// ```
/// use feedmail::util::wrap_line;
///
/// assert_eq!(wrap_line("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
/// assert_eq!(wrap_line("short", 0), vec!["short"]);
/// ```
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 || display_width(line) <= width {
        return vec![line.to_string()];
    }

    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let indent_width = display_width(indent);

    let mut lines = Vec::new();
    let mut current = String::from(indent);
    let mut current_width = indent_width;

    for word in body.split(' ').filter(|w| !w.is_empty()) {
        let word_width = display_width(word);
        let has_words = current_width > indent_width;
        if has_words && current_width + 1 + word_width > width {
            lines.push(std::mem::replace(&mut current, String::from(indent)));
            current_width = indent_width;
        }
        if current_width > indent_width {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
    }
    if current_width > indent_width || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Make feed-supplied text safe for a single-line mail header.
///
/// Line breaks and tabs become spaces; every other control character
/// (C0, DEL, C1) is dropped. Returns `Cow::Borrowed` when nothing changes.
pub fn sanitize_header_value(s: &str) -> Cow<'_, str> {
    let needs_work = s.chars().any(char::is_control);
    if !needs_work {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\r' | '\n' | '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Take at most `max_chars` characters (not bytes) from the start of `s`.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
