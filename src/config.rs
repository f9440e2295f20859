//! Configuration file parser for ~/.config/feedmail/config.toml.
//!
//! The file has a `[default]` table and one `[feed.<name>]` table per
//! subscription. A feed's effective options are the built-in defaults,
//! overlaid by `[default]`, overlaid by its own table. Keys come from a fixed
//! set; anything else is rejected so typos do not silently change behavior.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::feed::FeedError;

pub const DEFAULT_FROM: &str = "user@feedmail.invalid";

/// Stylesheet inlined into HTML mail when `use-css` is enabled.
pub const DEFAULT_CSS: &str = r#"h1 {
  font: 18pt Georgia, "Times New Roman";
}
body {
  font: 12pt Arial;
}
a:link {
  font: 12pt Arial;
  font-weight: bold;
  color: #0000cc;
}
blockquote {
  font-family: monospace;
}
.header {
  background: #e0ecff;
  border-bottom: solid 4px #c3d9ff;
  padding: 5px;
  margin-top: 0px;
  color: red;
}
.header a {
  font-size: 20px;
  text-decoration: none;
}
.footer {
  background: #c3d9ff;
  border-top: solid 4px #c3d9ff;
  padding: 5px;
  margin-bottom: 0px;
}
#entry {
  border: solid 4px #c3d9ff;
}
#body {
  margin-left: 5px;
  margin-right: 5px;
}
"#;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("No feed named '{0}'")]
    UnknownFeed(String),

    #[error("A feed named '{0}' already exists")]
    DuplicateFeed(String),
}

// ============================================================================
// Option Types
// ============================================================================

/// Which entry timestamp to use for the `Date` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Updated,
    Published,
    Created,
    Expired,
}

impl DateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DateKind::Updated => "modified",
            DateKind::Published => "issued",
            DateKind::Created => "created",
            DateKind::Expired => "expired",
        }
    }
}

impl FromStr for DateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "modified" | "updated" => Ok(DateKind::Updated),
            "issued" | "published" => Ok(DateKind::Published),
            "created" => Ok(DateKind::Created),
            "expired" => Ok(DateKind::Expired),
            other => Err(format!("unknown date kind '{}'", other)),
        }
    }
}

impl Serialize for DateKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fully resolved options for one feed.
///
/// SEC-015: Custom Debug impl masks `smtp_password`.
#[derive(Clone)]
pub struct FeedOptions {
    pub from: String,
    pub to: String,
    pub force_from: bool,
    pub use_publisher_email: bool,
    pub friendly_name: bool,
    pub active: bool,
    /// Seconds before a fetch is abandoned.
    pub feed_timeout: u64,
    pub proxy: String,
    pub date_header: bool,
    pub date_header_order: Vec<DateKind>,
    pub bonus_header: String,
    pub trust_guid: bool,
    pub html_mail: bool,
    pub use_css: bool,
    pub css: String,
    pub unicode_snob: bool,
    pub links_after_each_paragraph: bool,
    /// Wrap plain-text bodies at this many columns. 0 disables wrapping.
    pub body_width: u64,
    pub use_smtp: bool,
    pub smtp_server: String,
    pub smtp_auth: bool,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub smtp_ssl: bool,
    pub sendmail: String,
    pub verbose: String,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM.to_string(),
            to: String::new(),
            force_from: false,
            use_publisher_email: false,
            friendly_name: true,
            active: true,
            feed_timeout: 60,
            proxy: String::new(),
            date_header: false,
            date_header_order: vec![
                DateKind::Updated,
                DateKind::Published,
                DateKind::Created,
                DateKind::Expired,
            ],
            bonus_header: String::new(),
            trust_guid: true,
            html_mail: false,
            use_css: false,
            css: DEFAULT_CSS.to_string(),
            unicode_snob: false,
            links_after_each_paragraph: false,
            body_width: 0,
            use_smtp: false,
            smtp_server: "smtp.example.net:587".to_string(),
            smtp_auth: false,
            smtp_username: String::new(),
            smtp_password: SecretString::from(String::new()),
            smtp_ssl: false,
            sendmail: "/usr/sbin/sendmail".to_string(),
            verbose: "warn".to_string(),
        }
    }
}

impl fmt::Debug for FeedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password_set = !self.smtp_password.expose_secret().is_empty();
        f.debug_struct("FeedOptions")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("force_from", &self.force_from)
            .field("use_publisher_email", &self.use_publisher_email)
            .field("friendly_name", &self.friendly_name)
            .field("active", &self.active)
            .field("feed_timeout", &self.feed_timeout)
            .field("date_header", &self.date_header)
            .field("date_header_order", &self.date_header_order)
            .field("trust_guid", &self.trust_guid)
            .field("html_mail", &self.html_mail)
            .field("use_smtp", &self.use_smtp)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &password_set.then_some("[REDACTED]"))
            .field("sendmail", &self.sendmail)
            .finish_non_exhaustive()
    }
}

/// One table of the config file. Every key is optional; unset keys fall
/// through to the next tier.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OptionsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub force_from: Option<bool>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub use_publisher_email: Option<bool>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<bool>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(deserialize_with = "de_int", skip_serializing_if = "Option::is_none")]
    pub feed_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub date_header: Option<bool>,
    #[serde(
        deserialize_with = "de_date_kinds",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_header_order: Option<Vec<DateKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_header: Option<String>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub trust_guid: Option<bool>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub html_mail: Option<bool>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub use_css: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub unicode_snob: Option<bool>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub links_after_each_paragraph: Option<bool>,
    #[serde(deserialize_with = "de_int", skip_serializing_if = "Option::is_none")]
    pub body_width: Option<u64>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub use_smtp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub smtp_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,
    #[serde(deserialize_with = "de_bool", skip_serializing_if = "Option::is_none")]
    pub smtp_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sendmail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<String>,
}

/// SEC-015: never print the SMTP password, even from a raw layer.
impl fmt::Debug for OptionsLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsLayer")
            .field("url", &self.url)
            .field("to", &self.to)
            .field("from", &self.from)
            .field(
                "smtp_password",
                &self.smtp_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

macro_rules! overlay {
    ($dst:expr, $src:expr; $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = &$src.$field {
                $dst.$field = value.clone();
            }
        )*
    };
}

impl FeedOptions {
    /// Apply the keys set in `layer` on top of these options.
    pub fn overlay(&mut self, layer: &OptionsLayer) {
        overlay!(self, layer;
            from, to, force_from, use_publisher_email, friendly_name, active,
            feed_timeout, proxy, date_header, date_header_order, bonus_header,
            trust_guid, html_mail, use_css, css, unicode_snob,
            links_after_each_paragraph, body_width, use_smtp, smtp_server,
            smtp_auth, smtp_username, smtp_ssl, sendmail, verbose,
        );
        if let Some(password) = &layer.smtp_password {
            self.smtp_password = SecretString::from(password.clone());
        }
    }
}

// ============================================================================
// Value coercion
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Int(i64),
    Str(String),
}

fn de_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => b,
        BoolLike::Int(1) => true,
        BoolLike::Int(0) => false,
        BoolLike::Int(n) => {
            return Err(serde::de::Error::custom(format!("not a boolean: {}", n)));
        }
        BoolLike::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => true,
            "0" | "no" | "false" | "off" => false,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "not a boolean: '{}'",
                    other
                )));
            }
        },
    };
    Ok(Some(value))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntLike {
    Int(u64),
    Str(String),
}

fn de_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match IntLike::deserialize(deserializer)? {
        IntLike::Int(n) => Ok(Some(n)),
        IntLike::Str(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not an integer: '{}'", s))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListLike {
    Seq(Vec<String>),
    Str(String),
}

fn de_date_kinds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<DateKind>>, D::Error> {
    let items = match ListLike::deserialize(deserializer)? {
        ListLike::Seq(items) => items,
        ListLike::Str(s) => s.split(',').map(str::to_string).collect(),
    };
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

// ============================================================================
// Feed
// ============================================================================

/// A subscription: immutable name, URL, and resolved options.
#[derive(Debug, Clone)]
pub struct Feed {
    name: String,
    pub url: String,
    pub options: FeedOptions,
}

impl Feed {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        options: FeedOptions,
    ) -> Result<Self, FeedError> {
        let name = name.into();
        validate_feed_name(&name)?;
        Ok(Self {
            name,
            url: url.into(),
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.name, self.url, self.options.to)
    }
}

/// Names may only contain ASCII letters, digits, and `._-`.
pub fn validate_feed_name(name: &str) -> Result<(), FeedError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(FeedError::InvalidFeedName(name.to_string()))
    }
}

// ============================================================================
// Config
// ============================================================================

/// Raw on-disk shape of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub default: OptionsLayer,
    #[serde(rename = "feed")]
    pub feeds: BTreeMap<String, OptionsLayer>,
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML or unknown keys → `Err(ConfigError::Parse)`
    /// - `url` in `[default]` or an invalid feed name → `Err(ConfigError::Invalid/Feed)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), feeds = config.feeds.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default.url.is_some() {
            return Err(ConfigError::Invalid(
                "'url' is only allowed in [feed.<name>] tables".into(),
            ));
        }
        for name in self.feeds.keys() {
            validate_feed_name(name)?;
        }
        Ok(())
    }

    /// Write the config atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("toml.tmp");
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        let written = file
            .write_all(content.as_bytes())
            .and_then(|_| file.sync_all());
        drop(file);
        if let Err(e) = written.and_then(|_| std::fs::rename(&temp_path, path)) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(ConfigError::Io(e));
        }

        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Options shared by all feeds (built-ins overlaid by `[default]`).
    pub fn default_options(&self) -> FeedOptions {
        let mut options = FeedOptions::default();
        options.overlay(&self.default);
        options
    }

    pub fn feed_names(&self) -> impl Iterator<Item = &str> {
        self.feeds.keys().map(String::as_str)
    }

    /// Resolve a feed's identity and effective options.
    pub fn feed(&self, name: &str) -> Result<Feed, ConfigError> {
        let layer = self
            .feeds
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFeed(name.to_string()))?;
        let mut options = self.default_options();
        options.overlay(layer);
        let url = layer
            .url
            .clone()
            .ok_or_else(|| ConfigError::Invalid(format!("feed '{}' has no url", name)))?;
        Ok(Feed::new(name, url, options)?)
    }

    /// Add a subscription. `to` is stored only when it differs from the
    /// `[default]` recipient.
    pub fn add_feed(&mut self, name: &str, url: &str, to: Option<&str>) -> Result<(), ConfigError> {
        validate_feed_name(name)?;
        if self.feeds.contains_key(name) {
            return Err(ConfigError::DuplicateFeed(name.to_string()));
        }
        let parsed = url::Url::parse(url)
            .map_err(|e| ConfigError::Invalid(format!("invalid url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "unsupported scheme '{}' (only http/https allowed)",
                parsed.scheme()
            )));
        }

        let default_to = self.default.to.as_deref().unwrap_or("");
        let layer = OptionsLayer {
            url: Some(url.to_string()),
            to: to.filter(|t| *t != default_to).map(str::to_string),
            ..OptionsLayer::default()
        };
        self.feeds.insert(name.to_string(), layer);
        Ok(())
    }

    pub fn remove_feed(&mut self, name: &str) -> Result<(), ConfigError> {
        self.feeds
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::UnknownFeed(name.to_string()))
    }

    /// Record a permanent redirect.
    pub fn set_url(&mut self, name: &str, url: &str) -> Result<(), ConfigError> {
        let layer = self
            .feeds
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownFeed(name.to_string()))?;
        layer.url = Some(url.to_string());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[default]
from = "bot@example.com"
to = "me@example.com"
html-mail = "yes"
date-header-order = "issued, modified"

[feed.news]
url = "https://news.example.com/rss"
html-mail = false
body-width = "72"

[feed.blog]
url = "https://blog.example.com/atom.xml"
to = "other@example.com"
date-header-order = ["created"]
"#;

    #[test]
    fn test_default_options() {
        let options = FeedOptions::default();
        assert_eq!(options.from, DEFAULT_FROM);
        assert!(options.to.is_empty());
        assert!(options.trust_guid);
        assert!(options.friendly_name);
        assert!(!options.html_mail);
        assert_eq!(options.feed_timeout, 60);
        assert_eq!(options.date_header_order.len(), 4);
    }

    #[test]
    fn test_feed_falls_back_to_default_tier() {
        let config = Config::parse(SAMPLE).unwrap();
        let news = config.feed("news").unwrap();
        assert_eq!(news.name(), "news");
        assert_eq!(news.url, "https://news.example.com/rss");
        assert_eq!(news.options.from, "bot@example.com");
        assert_eq!(news.options.to, "me@example.com");
        assert!(!news.options.html_mail);
        assert_eq!(news.options.body_width, 72);
        assert_eq!(
            news.options.date_header_order,
            vec![DateKind::Published, DateKind::Updated]
        );
    }

    #[test]
    fn test_feed_overrides_default_tier() {
        let config = Config::parse(SAMPLE).unwrap();
        let blog = config.feed("blog").unwrap();
        assert_eq!(blog.options.to, "other@example.com");
        assert!(blog.options.html_mail);
        assert_eq!(blog.options.date_header_order, vec![DateKind::Created]);
    }

    #[test]
    fn test_unknown_key_is_error() {
        let result = Config::parse("[default]\ntotally-fake = 1\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_table_is_error() {
        let result = Config::parse("[feeds.x]\nurl = \"https://x\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_bad_boolean_is_error() {
        let result = Config::parse("[default]\nhtml-mail = \"maybe\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_date_kind_is_error() {
        let result = Config::parse("[default]\ndate-header-order = \"yesterday\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_url_in_default_is_invalid() {
        let result = Config::parse("[default]\nurl = \"https://x\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_feed_name_rejected() {
        let result = Config::parse("[feed.\"bad name\"]\nurl = \"https://x\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::Feed(FeedError::InvalidFeedName(_)))
        ));
    }

    #[test]
    fn test_feed_new_validates_name() {
        assert!(Feed::new("test-feed.1_a", "https://x", FeedOptions::default()).is_ok());
        match Feed::new("invalid name", "https://x", FeedOptions::default()) {
            Err(FeedError::InvalidFeedName(name)) => assert_eq!(name, "invalid name"),
            other => panic!("Expected InvalidFeedName, got {:?}", other),
        }
        assert!(Feed::new("", "https://x", FeedOptions::default()).is_err());
    }

    #[test]
    fn test_feed_display() {
        let mut options = FeedOptions::default();
        options.to = "a@b.com".into();
        let feed = Feed::new("test-feed", "http://example.com/feed.atom", options).unwrap();
        assert_eq!(
            feed.to_string(),
            "test-feed (http://example.com/feed.atom -> a@b.com)"
        );
    }

    #[test]
    fn test_unknown_feed() {
        let config = Config::default();
        assert!(matches!(
            config.feed("missing"),
            Err(ConfigError::UnknownFeed(_))
        ));
    }

    #[test]
    fn test_add_feed_skips_default_recipient() {
        let mut config = Config::parse(SAMPLE).unwrap();
        config
            .add_feed("new", "https://new.example.com/feed", Some("me@example.com"))
            .unwrap();
        assert!(config.feeds["new"].to.is_none());

        config
            .add_feed("new2", "https://new.example.com/feed2", Some("x@example.com"))
            .unwrap();
        assert_eq!(config.feeds["new2"].to.as_deref(), Some("x@example.com"));
    }

    #[test]
    fn test_add_feed_rejects_duplicates_and_bad_urls() {
        let mut config = Config::parse(SAMPLE).unwrap();
        assert!(matches!(
            config.add_feed("news", "https://x.example.com", None),
            Err(ConfigError::DuplicateFeed(_))
        ));
        assert!(matches!(
            config.add_feed("ftp", "ftp://x.example.com", None),
            Err(ConfigError::Invalid(_))
        ));
        assert!(config.add_feed("bad name", "https://x", None).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("feedmail_config_test_save");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let mut config = Config::parse(SAMPLE).unwrap();
        config.set_url("news", "https://moved.example.com/rss").unwrap();
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(
            reloaded.feed("news").unwrap().url,
            "https://moved.example.com/rss"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedmail_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("feedmail_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    // SEC-015: Debug output masks the SMTP password
    #[test]
    fn test_debug_masks_smtp_password() {
        let config =
            Config::parse("[default]\nsmtp-password = \"hunter2-secret\"\n").unwrap();
        let options = config.default_options();
        assert_eq!(options.smtp_password.expose_secret(), "hunter2-secret");

        let debug_output = format!("{:?} {:?}", options, config);
        assert!(!debug_output.contains("hunter2-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
