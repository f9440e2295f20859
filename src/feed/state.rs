//! Dynamic per-feed state: the fetch cursor and the seen map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Current version of the serialized [`FeedRuntimeState`].
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid feed state: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported feed state version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Map of guid → last processed id for one feed.
///
/// Never evicts: the full history is what lets an updated entry be told
/// apart from a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenStore(BTreeMap<String, String>);

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// An entry is new unless its guid is known *and* maps to the same id.
    pub fn is_new(&self, guid: &str, id: &str) -> bool {
        self.0.get(guid).map(String::as_str) != Some(id)
    }

    pub fn record(&mut self, guid: impl Into<String>, id: impl Into<String>) {
        self.0.insert(guid.into(), id.into());
    }

    pub fn get(&self, guid: &str) -> Option<&str> {
        self.0.get(guid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// What changes between runs of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRuntimeState {
    pub name: String,
    pub etag: Option<String>,
    pub modified: Option<String>,
    pub seen: SeenStore,
}

#[derive(Serialize)]
struct VersionedRef<'a> {
    version: u32,
    #[serde(flatten)]
    state: &'a FeedRuntimeState,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl FeedRuntimeState {
    /// Empty state for a feed that has never run.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            etag: None,
            modified: None,
            seen: SeenStore::new(),
        }
    }

    /// Drop the cursor and the seen map.
    pub fn reset(&mut self) {
        self.etag = None;
        self.modified = None;
        self.seen = SeenStore::new();
    }

    pub fn encode(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(&VersionedRef {
            version: STATE_VERSION,
            state: self,
        })?)
    }

    pub fn decode(raw: &str) -> Result<Self, StateError> {
        let probe: VersionProbe = serde_json::from_str(raw)?;
        if probe.version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: probe.version,
                expected: STATE_VERSION,
            });
        }
        Ok(serde_json::from_str(raw)?)
    }
}
