use std::time::Duration;

use chrono::Utc;

use super::classify::{classify, Warning};
use super::error::FeedError;
use super::fetcher::FeedSource;
use super::state::FeedRuntimeState;
use crate::config::Feed;
use crate::entry::{compose, resolve_guid, resolve_id};
use crate::mail::Mailer;
use crate::util::PlainRenderer;

/// Summary of one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub feed: String,
    /// Entries turned into messages (and sent, when sending).
    pub emitted: usize,
    /// Entries already seen with the same id.
    pub skipped: usize,
    /// New URL after a permanent redirect. Already applied to the feed.
    pub redirect: Option<String>,
    pub warnings: Vec<Warning>,
}

/// Runs one poll cycle of a feed against its capabilities.
pub struct FeedRunner<'a, S, R: ?Sized, M> {
    source: &'a S,
    renderer: &'a R,
    mailer: &'a M,
}

impl<'a, S, R, M> FeedRunner<'a, S, R, M>
where
    S: FeedSource,
    R: PlainRenderer + ?Sized,
    M: Mailer,
{
    pub fn new(source: &'a S, renderer: &'a R, mailer: &'a M) -> Self {
        Self {
            source,
            renderer,
            mailer,
        }
    }

    /// Fetch `feed`, emit one message per new or changed entry, and update
    /// `state`.
    ///
    /// Entries are processed oldest first. With `send == false` entries are
    /// composed and recorded as seen without being delivered.
    ///
    /// On [`FeedError::Send`] the entries before the failing one are already
    /// recorded in `state` and the fetch cursor is left untouched, so the
    /// caller should persist `state` (see [`FeedError::keeps_progress`]).
    /// Any other error leaves `state` unchanged.
    pub async fn run(
        &self,
        feed: &mut Feed,
        state: &mut FeedRuntimeState,
        send: bool,
    ) -> Result<RunReport, FeedError> {
        let name = feed.name().to_string();
        if feed.options.to.trim().is_empty() {
            return Err(FeedError::NoToEmailAddress(name));
        }

        tracing::debug!(feed = %name, url = %feed.url, "Fetching feed");
        let seconds = feed.options.feed_timeout;
        let parsed = tokio::time::timeout(
            Duration::from_secs(seconds),
            self.source.fetch(feed, state),
        )
        .await
        .map_err(|_| FeedError::Timeout {
            feed: name.clone(),
            seconds,
        })?
        .map_err(|e| FeedError::Fetch {
            feed: name.clone(),
            message: e.to_string(),
        })?;

        let classification = classify(&name, &parsed)?;
        if let Some(url) = &classification.redirect {
            tracing::info!(feed = %name, from = %feed.url, to = %url, "Feed moved permanently");
            feed.url = url.clone();
        }

        let mut report = RunReport {
            feed: name.clone(),
            redirect: classification.redirect,
            warnings: classification.warnings,
            ..RunReport::default()
        };

        let options = &feed.options;
        for entry in parsed.entries.iter().rev() {
            let id = resolve_id(entry, options.trust_guid, options.html_mail);
            let guid = resolve_guid(entry, id.as_deref()).unwrap_or_default();
            let id_key = id.as_deref().unwrap_or_default();

            if !state.seen.is_new(&guid, id_key) {
                tracing::debug!(feed = %name, guid = %guid, "Already seen");
                report.skipped += 1;
                continue;
            }

            let message = compose(feed, &parsed, entry, id.as_deref(), self.renderer, Utc::now());
            tracing::debug!(feed = %name, subject = %message.subject, "New entry");
            if send {
                if let Err(source) = self.mailer.send(&message).await {
                    tracing::error!(feed = %name, guid = %guid, error = %source, "Failed to send entry");
                    return Err(FeedError::Send {
                        feed: name,
                        guid,
                        source,
                    });
                }
            }
            state.seen.record(guid, id_key);
            report.emitted += 1;
        }

        state.etag = parsed.etag;
        state.modified = parsed.modified;

        tracing::info!(
            feed = %name,
            emitted = report.emitted,
            skipped = report.skipped,
            "Feed processed"
        );
        Ok(report)
    }
}
