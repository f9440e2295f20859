//! Orchestration of config, state database, and feed runs for the CLI.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::{Config, Feed};
use crate::feed::{FeedError, FeedRunner, FeedSource, HttpFetcher, RunReport};
use crate::mail::{LettreMailer, Mailer, StdoutMailer};
use crate::storage::Database;
use crate::util::HtmlText;

/// What `run` does with new entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Deliver through sendmail or SMTP.
    Mail,
    /// Print the messages to stdout.
    Stdout,
    /// Only mark entries as seen.
    Record,
}

/// Outcome of running one feed.
#[derive(Debug)]
pub enum FeedOutcome {
    Done(RunReport),
    Inactive,
    Failed(anyhow::Error),
}

/// Outcome of a `run` over several feeds.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, FeedOutcome)>,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, FeedOutcome::Failed(_)))
            .count()
    }

    pub fn emitted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                FeedOutcome::Done(report) => report.emitted,
                _ => 0,
            })
            .sum()
    }
}

pub struct App<S = HttpFetcher> {
    pub config: Config,
    config_path: PathBuf,
    db: Database,
    source: S,
}

impl App<HttpFetcher> {
    pub fn new(config: Config, config_path: PathBuf, db: Database) -> Result<Self> {
        let source = HttpFetcher::new().context("Failed to create HTTP client")?;
        Ok(Self::with_source(config, config_path, db, source))
    }
}

impl<S: FeedSource> App<S> {
    pub fn with_source(config: Config, config_path: PathBuf, db: Database, source: S) -> Self {
        Self {
            config,
            config_path,
            db,
            source,
        }
    }

    fn save_config(&self) -> Result<()> {
        self.config
            .save(&self.config_path)
            .with_context(|| format!("Failed to save config to {}", self.config_path.display()))
    }

    /// Subscribe to a feed.
    pub fn add(&mut self, name: &str, url: &str, to: Option<&str>) -> Result<Feed> {
        self.config.add_feed(name, url, to)?;
        self.save_config()?;
        let feed = self.config.feed(name)?;
        tracing::info!(feed = %name, url = %url, "Added feed");
        Ok(feed)
    }

    /// Unsubscribe and forget the feed's state.
    pub async fn remove(&mut self, name: &str) -> Result<()> {
        self.config.remove_feed(name)?;
        self.save_config()?;
        self.db
            .delete_state(name)
            .await
            .context("Failed to delete feed state")?;
        tracing::info!(feed = %name, "Removed feed");
        Ok(())
    }

    /// Forget what was seen so every current entry is sent again.
    pub async fn reset(&self, name: &str) -> Result<()> {
        // Unknown names are an error even if stale state exists
        self.config.feed(name)?;
        let mut state = self.db.load_state(name).await?;
        state.reset();
        self.db.save_state(&state).await?;
        tracing::info!(feed = %name, "Reset feed state");
        Ok(())
    }

    /// All configured feeds with their resolved options.
    pub fn feeds(&self) -> Result<Vec<Feed>> {
        self.config
            .feed_names()
            .map(|name| self.config.feed(name).map_err(anyhow::Error::from))
            .collect()
    }

    /// Run the named feeds, or all feeds when `names` is empty.
    ///
    /// Feeds run one after another. A failing feed is logged and recorded in
    /// the summary; the remaining feeds still run.
    pub async fn run(&mut self, names: &[String], delivery: Delivery) -> Result<RunSummary> {
        let names: Vec<String> = if names.is_empty() {
            self.config.feed_names().map(str::to_string).collect()
        } else {
            names.to_vec()
        };

        let mut summary = RunSummary::default();
        for name in names {
            let outcome = match self.run_feed(&name, delivery).await {
                Ok(Some(report)) => FeedOutcome::Done(report),
                Ok(None) => FeedOutcome::Inactive,
                Err(e) => {
                    let message = format!("{:#}", e);
                    tracing::error!(feed = %name, error = %message, "Feed run failed");
                    FeedOutcome::Failed(e)
                }
            };
            summary.outcomes.push((name, outcome));
        }
        Ok(summary)
    }

    /// Run one feed. Returns `None` for inactive feeds.
    async fn run_feed(&mut self, name: &str, delivery: Delivery) -> Result<Option<RunReport>> {
        let mut feed = self.config.feed(name)?;
        if !feed.options.active {
            tracing::info!(feed = %name, "Skipping inactive feed");
            return Ok(None);
        }

        let renderer = HtmlText::from_options(&feed.options);
        let report = match delivery {
            Delivery::Mail => {
                let mailer = LettreMailer::from_options(&feed.options)
                    .context("Failed to configure mail transport")?;
                self.run_with(&mut feed, &renderer, &mailer, true).await?
            }
            Delivery::Stdout => self.run_with(&mut feed, &renderer, &StdoutMailer, true).await?,
            Delivery::Record => self.run_with(&mut feed, &renderer, &StdoutMailer, false).await?,
        };
        Ok(Some(report))
    }

    async fn run_with<M: Mailer>(
        &mut self,
        feed: &mut Feed,
        renderer: &HtmlText,
        mailer: &M,
        send: bool,
    ) -> Result<RunReport> {
        let name = feed.name().to_string();
        let mut state = self.db.load_state(&name).await?;

        let runner = FeedRunner::new(&self.source, renderer, mailer);
        let result = runner.run(feed, &mut state, send).await;

        match result {
            Ok(report) => {
                self.db.save_state(&state).await?;
                if let Some(url) = &report.redirect {
                    self.config.set_url(&name, url)?;
                    self.save_config()?;
                }
                Ok(report)
            }
            Err(e) if e.keeps_progress() => {
                self.db.save_state(&state).await?;
                Err(anyhow::Error::new(e))
            }
            Err(e) => Err(log_feed_error(e)),
        }
    }
}

fn log_feed_error(e: FeedError) -> anyhow::Error {
    if let FeedError::NoToEmailAddress(name) = &e {
        tracing::warn!(feed = %name, "Set 'to' in [default] or [feed.{}]", name);
    }
    anyhow::Error::new(e)
}
