use thiserror::Error;

use crate::mail::MailError;

/// Errors that abort a feed run.
///
/// Anything that should only be reported and not stop the run is a
/// [`Warning`](super::classify::Warning) instead.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Feed names may only contain ASCII letters, digits, and `._-`.
    #[error("invalid feed name '{0}'")]
    InvalidFeedName(String),

    /// The feed has no recipient; nothing is fetched.
    #[error("no recipient address configured for feed '{0}'")]
    NoToEmailAddress(String),

    /// The fetch did not finish within `feed-timeout` seconds.
    #[error("fetching feed '{feed}' timed out after {seconds}s")]
    Timeout { feed: String, seconds: u64 },

    /// The server answered with a status we do not process.
    #[error("HTTP status {status} fetching feed '{feed}'")]
    Http { feed: String, status: u16 },

    /// The response had no entries, no feed version, and nothing else
    /// explained why, so it is probably not a feed at all.
    #[error("could not process feed '{0}': empty response with no recognizable feed version")]
    Processing(String),

    /// The caller asked the run to stop.
    #[error("run of feed '{0}' was cancelled")]
    Cancelled(String),

    /// The fetch capability itself failed.
    #[error("fetching feed '{feed}' failed: {message}")]
    Fetch { feed: String, message: String },

    /// Delivering one entry failed. Entries before it are recorded.
    #[error("sending entry '{guid}' of feed '{feed}' failed: {source}")]
    Send {
        feed: String,
        guid: String,
        #[source]
        source: MailError,
    },
}

impl FeedError {
    /// True when the run made progress worth persisting before failing.
    pub fn keeps_progress(&self) -> bool {
        matches!(self, FeedError::Send { .. })
    }
}
