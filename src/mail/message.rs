use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Mailbox, Mailboxes};

use super::MailError;
use crate::util::sanitize_header_value;

/// Ordered header list with case-insensitive, unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value of an existing header in place, or append it.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Insert only when a value is present.
    pub fn insert_opt(&mut self, name: &str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body format of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Html,
    Plain,
}

impl BodyType {
    /// Map a MIME type such as `text/html` to a body type.
    pub fn from_mime(mime: &str) -> Self {
        if mime.ends_with("html") || mime.ends_with("xhtml+xml") {
            BodyType::Html
        } else {
            BodyType::Plain
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BodyType::Html => "html",
            BodyType::Plain => "plain",
        }
    }
}

/// A composed mail, independent of the delivery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub content_type: BodyType,
    pub headers: Headers,
}

impl Message {
    /// Build the wire message.
    ///
    /// `recipient` may list several comma-separated mailboxes. Feed-supplied
    /// header values are flattened to a single line first.
    pub fn to_lettre(&self) -> Result<lettre::Message, MailError> {
        let from: Mailbox = self
            .sender
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", self.sender, e)))?;
        let to: Mailboxes = self
            .recipient
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", self.recipient, e)))?;

        let mut builder = lettre::Message::builder()
            .from(from)
            .subject(sanitize_header_value(&self.subject));
        for mailbox in to {
            builder = builder.to(mailbox);
        }
        for (name, value) in self.headers.iter() {
            let header_name = HeaderName::new_from_ascii(name.to_string())
                .map_err(|_| MailError::Header(name.to_string()))?;
            builder = builder.raw_header(HeaderValue::new(
                header_name,
                sanitize_header_value(value).into_owned(),
            ));
        }

        let content_type = match self.content_type {
            BodyType::Html => ContentType::TEXT_HTML,
            BodyType::Plain => ContentType::TEXT_PLAIN,
        };
        Ok(builder.header(content_type).body(self.body.clone())?)
    }

    /// RFC 5322 rendering, as handed to the transport.
    pub fn formatted(&self) -> Result<Vec<u8>, MailError> {
        Ok(self.to_lettre()?.formatted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        let mut headers = Headers::new();
        headers.insert("Message-ID", "<abc@dev.null.invalid>");
        headers.insert("X-RSS-Feed", "https://example.com/feed");
        Message {
            sender: "\"Blog: Jane\" <jane@example.com>".into(),
            recipient: "me@example.com, you@example.com".into(),
            subject: "Hello\nworld".into(),
            body: "Body text".into(),
            content_type: BodyType::Plain,
            headers,
        }
    }

    #[test]
    fn test_headers_replace_case_insensitively() {
        let mut headers = Headers::new();
        headers.insert("Date", "one");
        headers.insert("X-Extra", "1");
        headers.insert("date", "two");
        assert_eq!(headers.names().collect::<Vec<_>>(), vec!["Date", "X-Extra"]);
        assert_eq!(headers.get("DATE"), Some("two"));
    }

    #[test]
    fn test_insert_opt_skips_none() {
        let mut headers = Headers::new();
        headers.insert_opt("X-RSS-URL", None::<String>);
        assert!(headers.is_empty());
        headers.insert_opt("X-RSS-URL", Some("https://example.com"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_body_type_from_mime() {
        assert_eq!(BodyType::from_mime("text/html"), BodyType::Html);
        assert_eq!(BodyType::from_mime("application/xhtml+xml"), BodyType::Html);
        assert_eq!(BodyType::from_mime("text/plain"), BodyType::Plain);
    }

    #[test]
    fn test_formatted_carries_headers() {
        let raw = message().formatted().unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("X-RSS-Feed: https://example.com/feed"));
        assert!(text.contains("Message-ID: <abc@dev.null.invalid>"));
        assert!(text.contains("Subject: Hello world"));
        assert!(text.contains("you@example.com"));
        assert!(text.contains("Body text"));
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut m = message();
        m.sender = "not an address".into();
        assert!(matches!(m.to_lettre(), Err(MailError::Address(_))));
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut m = message();
        m.headers.insert("Bad Header", "x");
        assert!(matches!(m.to_lettre(), Err(MailError::Header(_))));
    }
}
