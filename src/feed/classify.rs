//! Classification of a fetch result into fatal errors and advisory warnings.

use std::fmt;

use super::error::FeedError;
use super::model::{ParseIssue, ParsedFeed};

/// Advisory condition found while classifying a fetch. The run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    NoHeaders,
    LooksLikeHtml,
    EmptyPage,
    UnrecognizedVersion,
    SocketTimeout,
    Socket(String),
    Url(String),
    Compression,
    Io(String),
    Xml(String),
    Other(String),
}

impl Warning {
    /// Transport and parse problems are logged as errors, the rest as warnings.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Warning::NoHeaders
                | Warning::LooksLikeHtml
                | Warning::EmptyPage
                | Warning::UnrecognizedVersion
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NoHeaders => f.write_str("could not get HTTP headers"),
            Warning::LooksLikeHtml => f.write_str("looks like HTML"),
            Warning::EmptyPage => f.write_str("empty page"),
            Warning::UnrecognizedVersion => f.write_str("unrecognized version"),
            Warning::SocketTimeout => f.write_str("timed out"),
            Warning::Socket(msg) => write!(f, "socket error: {}", msg),
            Warning::Url(msg) => write!(f, "URL error: {}", msg),
            Warning::Compression => f.write_str("broken compression"),
            Warning::Io(msg) => write!(f, "I/O error: {}", msg),
            Warning::Xml(msg) => write!(f, "XML parsing error: {}", msg),
            Warning::Other(msg) => write!(f, "processing error: {}", msg),
        }
    }
}

/// Outcome of a non-fatal classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// New URL when the server answered with a permanent redirect.
    pub redirect: Option<String>,
    pub warnings: Vec<Warning>,
}

/// Statuses that may still carry entries.
const ALLOWED_STATUSES: [u16; 4] = [200, 301, 302, 304];

/// Decide whether a fetch result can be processed.
///
/// Fatal: a status outside 200/301/302/304, a caller interruption, or an
/// empty 200/302 response without feed version when no warning explains it.
/// Everything else is logged and returned as warnings.
pub fn classify(feed: &str, parsed: &ParsedFeed) -> Result<Classification, FeedError> {
    let mut out = Classification::default();
    tracing::debug!(feed = %feed, status = parsed.status, "HTTP status");

    if parsed.status == 301 {
        if let Some(url) = &parsed.url {
            tracing::info!(feed = %feed, to = %url, "Permanent redirect");
            out.redirect = Some(url.clone());
        }
    } else if !ALLOWED_STATUSES.contains(&parsed.status) {
        return Err(FeedError::Http {
            feed: feed.to_string(),
            status: parsed.status,
        });
    }

    match &parsed.headers {
        Some(headers) if !headers.is_empty() => {
            tracing::debug!(feed = %feed, headers = ?headers, "HTTP headers");
            let content_type = parsed.header("content-type").unwrap_or("rss");
            if content_type.contains("html") {
                out.warnings.push(Warning::LooksLikeHtml);
            }
            if parsed.header("content-length") == Some("0") {
                out.warnings.push(Warning::EmptyPage);
            }
        }
        _ => out.warnings.push(Warning::NoHeaders),
    }

    match &parsed.version {
        Some(version) if !version.is_empty() => {
            tracing::debug!(feed = %feed, version = %version, "Feed version");
        }
        _ => out.warnings.push(Warning::UnrecognizedVersion),
    }

    match &parsed.bozo_exception {
        Some(ParseIssue::Interrupted) => return Err(FeedError::Cancelled(feed.to_string())),
        Some(issue) => out.warnings.push(issue_warning(issue)),
        None if parsed.bozo => out.warnings.push(Warning::Other("can't process".into())),
        None => {}
    }

    for warning in &out.warnings {
        if warning.is_error() {
            tracing::error!(feed = %feed, "{}", warning);
        } else {
            tracing::warn!(feed = %feed, "{}", warning);
        }
    }

    // The missing version is itself what this check is about, so it does
    // not count as an explanation.
    let explained = out
        .warnings
        .iter()
        .any(|w| *w != Warning::UnrecognizedVersion);
    let has_version = parsed.version.as_deref().is_some_and(|v| !v.is_empty());
    if !explained
        && matches!(parsed.status, 200 | 302)
        && parsed.entries.is_empty()
        && !has_version
    {
        return Err(FeedError::Processing(feed.to_string()));
    }

    Ok(out)
}

fn issue_warning(issue: &ParseIssue) -> Warning {
    match issue {
        ParseIssue::SocketTimeout => Warning::SocketTimeout,
        ParseIssue::Socket(msg) => Warning::Socket(msg.clone()),
        ParseIssue::Url(msg) => Warning::Url(msg.clone()),
        ParseIssue::Compression => Warning::Compression,
        ParseIssue::Io(msg) => Warning::Io(msg.clone()),
        ParseIssue::Xml(msg) => Warning::Xml(msg.clone()),
        ParseIssue::Other(msg) => Warning::Other(msg.clone()),
        // Handled by the caller before mapping.
        ParseIssue::Interrupted => Warning::Other("interrupted".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::Entry;
    use std::collections::HashMap;

    fn headers(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn healthy() -> ParsedFeed {
        ParsedFeed {
            headers: headers(&[("content-type", "application/rss+xml")]),
            version: Some("rss20".into()),
            entries: vec![Entry::default()],
            ..ParsedFeed::default()
        }
    }

    #[test]
    fn test_healthy_feed_has_no_warnings() {
        let result = classify("f", &healthy()).unwrap();
        assert!(result.warnings.is_empty());
        assert!(result.redirect.is_none());
    }

    #[test]
    fn test_404_is_http_error() {
        let parsed = ParsedFeed {
            status: 404,
            ..healthy()
        };
        match classify("f", &parsed) {
            Err(FeedError::Http { status: 404, .. }) => {}
            other => panic!("Expected Http(404), got {:?}", other),
        }
    }

    #[test]
    fn test_301_reports_redirect() {
        let parsed = ParsedFeed {
            status: 301,
            url: Some("https://new.example.com/feed".into()),
            ..healthy()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(
            result.redirect.as_deref(),
            Some("https://new.example.com/feed")
        );
    }

    #[test]
    fn test_304_is_allowed() {
        let parsed = ParsedFeed {
            status: 304,
            entries: Vec::new(),
            ..healthy()
        };
        assert!(classify("f", &parsed).is_ok());
    }

    #[test]
    fn test_empty_200_without_version_is_processing_error() {
        let parsed = ParsedFeed {
            headers: headers(&[("content-type", "application/xml")]),
            ..ParsedFeed::default()
        };
        assert!(matches!(
            classify("f", &parsed),
            Err(FeedError::Processing(_))
        ));
    }

    #[test]
    fn test_empty_200_with_other_warning_continues() {
        let parsed = ParsedFeed {
            headers: None,
            ..ParsedFeed::default()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(
            result.warnings,
            vec![Warning::NoHeaders, Warning::UnrecognizedVersion]
        );
    }

    #[test]
    fn test_empty_304_without_version_continues() {
        let parsed = ParsedFeed {
            status: 304,
            headers: headers(&[("etag", "\"abc\"")]),
            ..ParsedFeed::default()
        };
        assert!(classify("f", &parsed).is_ok());
    }

    #[test]
    fn test_empty_feed_with_version_continues() {
        let parsed = ParsedFeed {
            entries: Vec::new(),
            ..healthy()
        };
        assert!(classify("f", &parsed).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_html_content_type_warns() {
        let parsed = ParsedFeed {
            headers: headers(&[("content-type", "text/html; charset=utf-8")]),
            ..healthy()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(result.warnings, vec![Warning::LooksLikeHtml]);
    }

    #[test]
    fn test_zero_content_length_warns() {
        let parsed = ParsedFeed {
            headers: headers(&[("content-type", "application/xml"), ("content-length", "0")]),
            ..healthy()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(result.warnings, vec![Warning::EmptyPage]);
    }

    #[test]
    fn test_missing_headers_warns() {
        let parsed = ParsedFeed {
            headers: None,
            ..healthy()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(result.warnings, vec![Warning::NoHeaders]);
    }

    #[test]
    fn test_bozo_issues_are_non_fatal() {
        let parsed = ParsedFeed {
            bozo: true,
            bozo_exception: Some(ParseIssue::Xml("mismatched tag".into())),
            ..healthy()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(result.warnings, vec![Warning::Xml("mismatched tag".into())]);
        assert!(result.warnings[0].is_error());
    }

    #[test]
    fn test_bare_bozo_flag_warns() {
        let parsed = ParsedFeed {
            bozo: true,
            ..healthy()
        };
        let result = classify("f", &parsed).unwrap();
        assert_eq!(result.warnings, vec![Warning::Other("can't process".into())]);
    }

    #[test]
    fn test_interruption_is_reraised() {
        let parsed = ParsedFeed {
            bozo: true,
            bozo_exception: Some(ParseIssue::Interrupted),
            ..healthy()
        };
        assert!(matches!(
            classify("f", &parsed),
            Err(FeedError::Cancelled(_))
        ));
    }
}
