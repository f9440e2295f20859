//! Utility functions shared by the renderers and header synthesis.
//!
//! - **HTML**: escaping, entity decoding, and HTML → text conversion
//! - **Text processing**: Unicode-aware wrapping and header sanitizing

mod html;
mod text;

pub use html::{escape_html, unescape_html, HtmlText, PlainRenderer};
pub use text::{display_width, sanitize_header_value, take_chars, wrap_line};
