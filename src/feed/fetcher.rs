use std::collections::HashMap;
use std::future::Future;

use futures::StreamExt;
use reqwest::header::{self, HeaderMap};
use reqwest::{redirect, StatusCode};
use thiserror::Error;

use super::model::{ParseIssue, ParsedFeed};
use super::parser::{parse_feed, ParsedDocument};
use super::state::FeedRuntimeState;
use crate::config::Feed;
use crate::entry::USER_AGENT;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_REDIRECTS: usize = 5;

/// Failures of the fetch capability itself.
///
/// Network and parse problems are not errors: they are reported through
/// [`ParsedFeed::bozo_exception`] and classified by the runner.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be built (bad proxy, TLS setup)
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The configured proxy URL is not usable
    #[error("Invalid proxy '{0}'")]
    Proxy(String),
}

/// Produces a parsed feed for one run.
pub trait FeedSource {
    fn fetch(
        &self,
        feed: &Feed,
        state: &FeedRuntimeState,
    ) -> impl Future<Output = Result<ParsedFeed, FetchError>> + Send;
}

/// Fetches feeds over HTTP(S) and parses them with feed-rs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            client: Self::builder().build()?,
        })
    }

    fn builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
    }

    /// The shared client, or a dedicated one when the feed sets a proxy.
    fn client_for(&self, feed: &Feed) -> Result<reqwest::Client, FetchError> {
        let proxy = feed.options.proxy.trim();
        if proxy.is_empty() {
            return Ok(self.client.clone());
        }
        let proxy = reqwest::Proxy::all(proxy).map_err(|_| FetchError::Proxy(proxy.to_string()))?;
        Ok(Self::builder().proxy(proxy).build()?)
    }

    async fn fetch_one(
        &self,
        feed: &Feed,
        state: &FeedRuntimeState,
    ) -> Result<ParsedFeed, FetchError> {
        let client = self.client_for(feed)?;
        let mut url = feed.url.clone();
        let mut first_hop: Option<StatusCode> = None;
        let mut hops = 0;

        let response = loop {
            let mut request = client.get(&url);
            if let Some(etag) = &state.etag {
                request = request.header(header::IF_NONE_MATCH, etag);
            }
            if let Some(modified) = &state.modified {
                request = request.header(header::IF_MODIFIED_SINCE, modified);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(feed = %feed.name(), url = %url, error = %e, "Request failed");
                    return Ok(ParsedFeed::from_issue(issue_from_reqwest(&e)));
                }
            };

            let status = response.status();
            if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
                break response;
            }
            let Some(target) = redirect_target(&url, response.headers()) else {
                break response;
            };

            first_hop.get_or_insert(status);
            hops += 1;
            if hops > MAX_REDIRECTS {
                return Ok(ParsedFeed::from_issue(ParseIssue::Url(format!(
                    "too many redirects fetching {}",
                    feed.url
                ))));
            }
            tracing::debug!(feed = %feed.name(), from = %url, to = %target, status = %status, "Following redirect");
            url = target;
        };

        let mut parsed = ParsedFeed {
            status: response.status().as_u16(),
            headers: Some(header_map(response.headers())),
            etag: header_str(response.headers(), header::ETAG),
            modified: header_str(response.headers(), header::LAST_MODIFIED),
            ..ParsedFeed::default()
        };
        let final_status = response.status();
        // A redirect that ends in an error reports the error status
        let landed = final_status.is_success() || final_status == StatusCode::NOT_MODIFIED;
        if let Some(first) = first_hop.filter(|_| landed) {
            parsed.url = Some(url.clone());
            parsed.status = match first {
                StatusCode::MOVED_PERMANENTLY | StatusCode::PERMANENT_REDIRECT => 301,
                _ => 302,
            };
        }

        if final_status == StatusCode::NOT_MODIFIED || !final_status.is_success() {
            return Ok(parsed);
        }

        let bytes = match read_limited_bytes(response, MAX_FEED_SIZE).await {
            Ok(bytes) => bytes,
            Err(issue) => {
                parsed.bozo = true;
                parsed.bozo_exception = Some(issue);
                return Ok(parsed);
            }
        };

        match parse_feed(&bytes) {
            Ok(ParsedDocument {
                version,
                entries,
                feed: meta,
            }) => {
                parsed.version = version;
                parsed.entries = entries;
                parsed.feed = meta;
            }
            Err(issue) => {
                tracing::debug!(feed = %feed.name(), "Response did not parse as a feed");
                parsed.bozo = true;
                parsed.bozo_exception = Some(issue);
            }
        }
        Ok(parsed)
    }
}

impl FeedSource for HttpFetcher {
    async fn fetch(
        &self,
        feed: &Feed,
        state: &FeedRuntimeState,
    ) -> Result<ParsedFeed, FetchError> {
        self.fetch_one(feed, state).await
    }
}

fn redirect_target(current: &str, headers: &HeaderMap) -> Option<String> {
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    let base = url::Url::parse(current).ok()?;
    base.join(location).ok().map(String::from)
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn issue_from_reqwest(e: &reqwest::Error) -> ParseIssue {
    if e.is_timeout() {
        ParseIssue::SocketTimeout
    } else if e.is_connect() {
        ParseIssue::Socket(e.to_string())
    } else if e.is_builder() || e.is_redirect() {
        ParseIssue::Url(e.to_string())
    } else if e.is_decode() {
        ParseIssue::Compression
    } else if e.is_body() {
        ParseIssue::Io(e.to_string())
    } else {
        ParseIssue::Other(e.to_string())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ParseIssue> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(ParseIssue::Other(format!("response too large ({} bytes)", len)));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| issue_from_reqwest(&e))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ParseIssue::Other(format!(
                "response exceeded {} bytes",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
