//! Feed side of the pipeline: fetching, parsing, classification, per-feed
//! state, and the run state machine.
//!
//! - `fetcher` - HTTP retrieval behind the [`FeedSource`] trait
//! - `parser` - RSS/Atom/JSON parsing using the `feed-rs` crate
//! - `classify` - fatal vs. advisory outcome of a fetch
//! - `state` - versioned per-feed runtime state and the seen map
//! - `runner` - one poll cycle: fetch, classify, emit, record

mod classify;
mod error;
mod fetcher;
mod model;
mod parser;
mod runner;
mod state;

pub use classify::{classify, Classification, Warning};
pub use error::FeedError;
pub use fetcher::{FeedSource, FetchError, HttpFetcher};
pub use model::{
    Content, Enclosure, Entry, FeedMeta, Link, ParseIssue, ParsedFeed, Person, Tag, TEXT_HTML,
    TEXT_PLAIN, XHTML,
};
pub use parser::{parse_feed, ParsedDocument};
pub use runner::{FeedRunner, RunReport};
pub use state::{FeedRuntimeState, SeenStore, StateError, STATE_VERSION};
